// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory result tree for a single test run.
//!
//! Every node lives in an arena owned by a [`TestContainer`]. Parent and child
//! links are [`NodeIndex`] values into that arena, so walking up for failure
//! propagation or down for rendering never involves shared ownership.

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

/// Name marker the runner prepends to tests that were ignored.
pub const IGNORED_PREFIX: &str = "@Ignore: ";

/// Name marker the runner prepends to tests whose assumptions failed.
pub const ASSUMPTION_FAILURE_PREFIX: &str = "@AssumptionFailure: ";

/// An informational marker carried at the start of a test name.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NameMarker {
    /// The test was ignored (`@Ignore: `).
    Ignored,

    /// The test's assumptions did not hold (`@AssumptionFailure: `).
    AssumptionFailure,
}

impl NameMarker {
    /// Splits a leading marker off `name`, returning the marker (if any) and
    /// the remaining name.
    pub fn strip(name: &str) -> (Option<Self>, &str) {
        if let Some(rest) = name.strip_prefix(IGNORED_PREFIX) {
            (Some(Self::Ignored), rest)
        } else if let Some(rest) = name.strip_prefix(ASSUMPTION_FAILURE_PREFIX) {
            (Some(Self::AssumptionFailure), rest)
        } else {
            (None, name)
        }
    }
}

/// The identifier a runner assigns to a test node.
///
/// The JUnit runner uses decimal numbers, the TestNG runner uses test names.
/// Both are kept as strings.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestId(SmolStr);

impl TestId {
    /// Creates a new `TestId`.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The position of a node within its [`TestContainer`].
///
/// Indexes are only meaningful for the container that produced them.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeIndex(usize);

/// Everything known about a test node when it is first declared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestDeclaration {
    /// The runner-assigned identifier.
    pub id: TestId,

    /// The raw name, possibly carrying a [`NameMarker`].
    pub name: String,

    /// A human-friendly name, if the runner supplied one.
    pub display_name: Option<String>,

    /// Whether this node is a suite (a class or container) rather than a test.
    pub is_suite: bool,

    /// The number of tests the runner expects below this node.
    pub count: usize,

    /// Whether the node was generated at runtime (dynamic or parameterized tests).
    pub is_dynamic: bool,

    /// The parent node. `None`, or the node's own id, means this is a root.
    pub parent_id: Option<TestId>,

    /// Parameter types of a parameterized test method.
    pub parameter_types: Option<String>,

    /// The JUnit Platform unique id.
    pub unique_id: Option<String>,
}

impl TestDeclaration {
    /// Declares a flat test with no parent and no extra metadata.
    pub fn leaf(id: TestId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: None,
            is_suite: false,
            count: 1,
            is_dynamic: false,
            parent_id: None,
            parameter_types: None,
            unique_id: None,
        }
    }
}

/// A node in the result tree: a single test or a suite.
#[derive(Clone, Debug)]
pub struct Test {
    id: TestId,
    name: String,
    display_name: Option<String>,
    is_suite: bool,
    is_dynamic: bool,
    count: usize,
    parameter_types: Option<String>,
    unique_id: Option<String>,

    started: bool,
    failed: bool,
    pub(crate) ignored: bool,
    assumption_failed: bool,
    pub(crate) message: Option<String>,
    pub(crate) trace: String,
    pub(crate) actual: String,
    pub(crate) expected: String,
    pub(crate) runtime: Option<Duration>,

    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

impl Test {
    fn new(declaration: TestDeclaration, parent: Option<NodeIndex>) -> Self {
        let TestDeclaration {
            id,
            name,
            display_name,
            is_suite,
            count,
            is_dynamic,
            parent_id: _,
            parameter_types,
            unique_id,
        } = declaration;

        let (marker, stripped) = NameMarker::strip(&name);
        let name = stripped.to_owned();
        let display_name =
            display_name.map(|display_name| NameMarker::strip(&display_name).1.to_owned());

        Self {
            id,
            name,
            display_name,
            is_suite,
            is_dynamic,
            count,
            parameter_types,
            unique_id,
            started: false,
            failed: false,
            ignored: marker == Some(NameMarker::Ignored),
            // The assumption-failure marker only means something on %FAILED.
            assumption_failed: false,
            message: None,
            trace: String::new(),
            actual: String::new(),
            expected: String::new(),
            runtime: None,
            parent,
            children: Vec::new(),
        }
    }

    /// Returns the runner-assigned identifier.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Returns the name, with any ignored or assumption-failure marker stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name, if the runner supplied a non-empty one.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the display name, falling back to the name.
    pub fn label(&self) -> &str {
        self.display_name().unwrap_or(&self.name)
    }

    /// Returns true if this node is a suite.
    pub fn is_suite(&self) -> bool {
        self.is_suite
    }

    /// Returns true if this node was generated at runtime.
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Returns the number of tests the runner expected below this node.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the parameter types of a parameterized test.
    pub fn parameter_types(&self) -> Option<&str> {
        self.parameter_types.as_deref()
    }

    /// Returns the JUnit Platform unique id.
    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    /// Returns true if the runner reported this test as started.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Returns true if this node, or any node below it, failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Returns true if the runner reported this test as ignored.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Returns true if this test's assumptions did not hold.
    ///
    /// Assumption failures are not propagated to ancestors.
    pub fn is_assumption_failed(&self) -> bool {
        self.assumption_failed
    }

    /// Returns true if this test never ran.
    pub fn is_skipped(&self) -> bool {
        !self.started || self.ignored
    }

    /// Returns the failure message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the accumulated stack trace. Empty if none was sent.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Returns the accumulated actual value of a failed assertion.
    pub fn actual(&self) -> &str {
        &self.actual
    }

    /// Returns the accumulated expected value of a failed assertion.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Returns the time the test took, if the runner reported it.
    pub fn runtime(&self) -> Option<Duration> {
        self.runtime
    }

    /// Returns this node's parent, or `None` for a root.
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Returns this node's children, in discovery order.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }
}

/// Owns every [`Test`] of one run.
///
/// The nodes form a forest: each is reachable from exactly one root, and
/// roots and children are kept in discovery order.
#[derive(Clone, Debug, Default)]
pub struct TestContainer {
    nodes: Vec<Test>,
    by_id: IndexMap<TestId, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl TestContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a newly declared node and links it to its parent.
    ///
    /// Returns `None` without changing anything if a node with the same id
    /// already exists. A parent id equal to the node's own id marks a root;
    /// an unknown parent id is logged and the node becomes a root as well.
    pub fn insert(&mut self, declaration: TestDeclaration) -> Option<NodeIndex> {
        if self.by_id.contains_key(&declaration.id) {
            warn!(
                "ignoring duplicate declaration of test `{}` ({})",
                declaration.id, declaration.name
            );
            return None;
        }

        let parent = match &declaration.parent_id {
            None => None,
            Some(parent_id) if *parent_id == declaration.id => None,
            Some(parent_id) => match self.by_id.get(parent_id) {
                Some(&parent) => Some(parent),
                None => {
                    warn!(
                        "test `{}` refers to unknown parent `{parent_id}`, treating it as a root",
                        declaration.id
                    );
                    None
                }
            },
        };

        let index = NodeIndex(self.nodes.len());
        let id = declaration.id.clone();
        self.nodes.push(Test::new(declaration, parent));
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(index),
            None => self.roots.push(index),
        }
        self.by_id.insert(id, index);

        Some(index)
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no nodes have been declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up the index of the node with the given id.
    pub fn index_of(&self, id: &TestId) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &TestId) -> Option<&Test> {
        self.index_of(id).map(|index| &self.nodes[index.0])
    }

    pub(crate) fn get_mut(&mut self, id: &TestId) -> Option<&mut Test> {
        let index = self.index_of(id)?;
        Some(&mut self.nodes[index.0])
    }

    /// Returns the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` was produced by a different container.
    pub fn node(&self, index: NodeIndex) -> &Test {
        &self.nodes[index.0]
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut Test {
        &mut self.nodes[index.0]
    }

    /// Returns the roots, in discovery order.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Returns the children of the node at `index`, in discovery order.
    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        self.node(index).children()
    }

    /// Iterates over all nodes in discovery order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Test> + '_ {
        self.nodes.iter()
    }

    /// Walks the forest depth-first, pre-order, yielding each node with its
    /// depth (0 for roots).
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            container: self,
            stack: self.roots.iter().rev().map(|&index| (0, index)).collect(),
        }
    }

    /// Marks the node with the given id as started, along with any ancestors
    /// that haven't started yet.
    ///
    /// Runners only report leaf tests as starting, so a suite counts as
    /// started once anything inside it has. Returns false if no such node
    /// exists.
    pub fn mark_started(&mut self, id: &TestId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.mark_started_at(index);
                true
            }
            None => {
                debug!("start event for unknown test `{id}`");
                false
            }
        }
    }

    pub(crate) fn mark_started_at(&mut self, index: NodeIndex) {
        let mut current = Some(index);
        while let Some(index) = current {
            let test = &mut self.nodes[index.0];
            if test.started {
                break;
            }
            test.started = true;
            current = test.parent;
        }
    }

    /// Marks the node with the given id, and every ancestor, as failed.
    ///
    /// Returns false if no such node exists.
    pub fn mark_failed(&mut self, id: &TestId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.mark_failed_at(index);
                true
            }
            None => {
                debug!("failure event for unknown test `{id}`");
                false
            }
        }
    }

    pub(crate) fn mark_failed_at(&mut self, index: NodeIndex) {
        let mut current = Some(index);
        while let Some(index) = current {
            let test = &mut self.nodes[index.0];
            if test.failed {
                // Ancestors of a failed node are already failed.
                break;
            }
            test.failed = true;
            current = test.parent;
        }
    }

    /// Records that the node with the given id had an assumption failure.
    ///
    /// Unlike [`Self::mark_failed`], this does not touch ancestors. Returns
    /// false if no such node exists.
    pub fn mark_assumption_failed(&mut self, id: &TestId) -> bool {
        match self.get_mut(id) {
            Some(test) => {
                test.assumption_failed = true;
                true
            }
            None => {
                debug!("assumption failure for unknown test `{id}`");
                false
            }
        }
    }
}

/// A depth-first, pre-order walk over a [`TestContainer`].
///
/// Returned by [`TestContainer::walk`].
#[derive(Clone, Debug)]
pub struct Walk<'a> {
    container: &'a TestContainer,
    stack: Vec<(usize, NodeIndex)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Test);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, index) = self.stack.pop()?;
        let test = self.container.node(index);
        self.stack
            .extend(test.children.iter().rev().map(|&child| (depth + 1, child)));
        Some((depth, test))
    }
}

/// Counts of test outcomes in a finished run.
///
/// Suites are not counted as tests; only the tests inside them are. A suite
/// that failed by itself, such as in a class-level setup method, is counted in
/// [`Self::suite_failures`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// The number of tests.
    pub tests: usize,

    /// The number of tests that ran and did not fail.
    pub passed: usize,

    /// The number of tests that failed or errored.
    pub failed: usize,

    /// The number of tests that were ignored or never started.
    pub skipped: usize,

    /// The number of tests whose assumptions did not hold.
    pub assumption_failures: usize,

    /// The number of suites that failed while no test inside them did.
    pub suite_failures: usize,
}

impl RunSummary {
    /// Computes the summary for a container.
    pub fn new(container: &TestContainer) -> Self {
        let mut summary = Self::default();
        for test in container.iter() {
            if test.is_suite() {
                // Failures propagate upwards, so a failed descendant always
                // shows up as a failed child.
                let own_failure = test.is_failed()
                    && !test
                        .children()
                        .iter()
                        .any(|&child| container.node(child).is_failed());
                if own_failure {
                    summary.suite_failures += 1;
                }
                continue;
            }

            summary.tests += 1;
            if test.is_failed() {
                summary.failed += 1;
            } else if test.is_assumption_failed() {
                summary.assumption_failures += 1;
            } else if test.is_skipped() {
                summary.skipped += 1;
            } else {
                summary.passed += 1;
            }
        }
        summary
    }

    /// Returns true if no test or suite failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.suite_failures == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn declare(id: &str, parent: Option<&str>) -> TestDeclaration {
        TestDeclaration {
            parent_id: parent.map(TestId::from),
            ..TestDeclaration::leaf(TestId::from(id), format!("test-{id}"))
        }
    }

    fn suite(id: &str, parent: &str) -> TestDeclaration {
        TestDeclaration {
            is_suite: true,
            ..declare(id, Some(parent))
        }
    }

    /// Builds:
    ///
    /// ```text
    /// 1
    /// ├── 2
    /// │   ├── 4
    /// │   └── 5
    /// └── 3
    /// 6
    /// ```
    fn sample_tree() -> TestContainer {
        let mut container = TestContainer::new();
        container.insert(suite("1", "1"));
        container.insert(suite("2", "1"));
        container.insert(declare("3", Some("1")));
        container.insert(declare("4", Some("2")));
        container.insert(declare("5", Some("2")));
        container.insert(declare("6", None));
        container
    }

    fn ids_of(container: &TestContainer, indexes: &[NodeIndex]) -> Vec<String> {
        indexes
            .iter()
            .map(|&index| container.node(index).id().to_string())
            .collect()
    }

    #[test]
    fn self_referential_parent_is_root() {
        let container = sample_tree();
        let root = container.get(&"1".into()).unwrap();
        assert_eq!(root.parent(), None);
        assert_eq!(ids_of(&container, container.roots()), ["1", "6"]);
    }

    #[test]
    fn parent_resolves_to_previously_inserted_node() {
        let container = sample_tree();
        let leaf = container.get(&"5".into()).unwrap();
        assert_eq!(leaf.parent(), container.index_of(&"2".into()));
        let parent = container.get(&"2".into()).unwrap();
        assert_eq!(ids_of(&container, parent.children()), ["4", "5"]);

        let root = container.index_of(&"1".into()).unwrap();
        assert_eq!(ids_of(&container, container.children(root)), ["2", "3"]);
    }

    #[test]
    fn unknown_parent_becomes_root() {
        let mut container = TestContainer::new();
        container.insert(declare("7", Some("99")));
        assert_eq!(container.get(&"7".into()).unwrap().parent(), None);
        assert_eq!(container.roots().len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut container = sample_tree();
        assert_eq!(container.insert(declare("4", Some("3"))), None);
        assert_eq!(container.len(), 6);
        let parent = container.get(&"3".into()).unwrap();
        assert!(parent.children().is_empty());
    }

    #[test]
    fn failure_propagates_to_ancestors_only() {
        let mut container = sample_tree();
        assert!(container.mark_failed(&"4".into()));

        let failed: Vec<_> = container
            .iter()
            .filter(|test| test.is_failed())
            .map(|test| test.id().to_string())
            .collect();
        assert_eq!(failed, ["1", "2", "4"]);

        // A second, unrelated failure leaves the first leaf's sibling alone.
        assert!(container.mark_failed(&"3".into()));
        assert!(!container.get(&"5".into()).unwrap().is_failed());
        assert!(!container.get(&"6".into()).unwrap().is_failed());
    }

    #[test]
    fn start_reaches_enclosing_suites() {
        let mut container = sample_tree();
        assert!(container.mark_started(&"5".into()));
        let started: Vec<_> = container
            .iter()
            .filter(|test| test.is_started())
            .map(|test| test.id().to_string())
            .collect();
        assert_eq!(started, ["1", "2", "5"]);
    }

    #[test]
    fn assumption_failure_does_not_propagate() {
        let mut container = sample_tree();
        assert!(container.mark_assumption_failed(&"5".into()));
        assert!(container.get(&"5".into()).unwrap().is_assumption_failed());
        assert!(!container.get(&"2".into()).unwrap().is_failed());
        assert!(!container.get(&"1".into()).unwrap().is_failed());
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut container = sample_tree();
        assert!(!container.mark_started(&"42".into()));
        assert!(!container.mark_failed(&"42".into()));
        assert!(!container.mark_assumption_failed(&"42".into()));
        assert!(container.iter().all(|test| !test.is_failed()));
    }

    #[test]
    fn walk_is_pre_order_with_depths() {
        let container = sample_tree();
        let walked: Vec<_> = container
            .walk()
            .map(|(depth, test)| (depth, test.id().to_string()))
            .collect();
        assert_eq!(
            walked,
            [
                (0, "1".to_owned()),
                (1, "2".to_owned()),
                (2, "4".to_owned()),
                (2, "5".to_owned()),
                (1, "3".to_owned()),
                (0, "6".to_owned()),
            ]
        );
    }

    #[test]
    fn name_markers_are_stripped() {
        let mut container = TestContainer::new();
        let mut declaration =
            TestDeclaration::leaf(TestId::from("1"), format!("{IGNORED_PREFIX}skipMe"));
        declaration.display_name = Some(format!("{IGNORED_PREFIX}Skip me"));
        container.insert(declaration);
        container.insert(TestDeclaration::leaf(
            TestId::from("2"),
            format!("{ASSUMPTION_FAILURE_PREFIX}onlyOnLinux"),
        ));

        let ignored = container.get(&"1".into()).unwrap();
        assert_eq!(ignored.name(), "skipMe");
        assert_eq!(ignored.label(), "Skip me");
        assert!(ignored.is_ignored());

        let assumption = container.get(&"2".into()).unwrap();
        assert_eq!(assumption.name(), "onlyOnLinux");
        assert!(!assumption.is_assumption_failed());
        assert!(!assumption.is_ignored());
        assert_eq!(
            RunSummary::new(&container),
            RunSummary {
                tests: 2,
                skipped: 2,
                ..RunSummary::default()
            }
        );
    }

    #[test]
    fn summary_counts_tests_not_suites() {
        let mut container = sample_tree();
        for id in ["3", "4", "5"] {
            container.mark_started(&id.into());
        }
        container.mark_failed(&"4".into());
        container.mark_assumption_failed(&"5".into());

        assert_eq!(
            RunSummary::new(&container),
            RunSummary {
                tests: 4,
                passed: 1,
                failed: 1,
                skipped: 1,
                assumption_failures: 1,
                suite_failures: 0,
            }
        );
    }

    #[test]
    fn suite_failing_on_its_own_is_counted() {
        let mut container = sample_tree();
        container.mark_failed(&"2".into());

        let summary = RunSummary::new(&container);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.suite_failures, 1);
        assert!(!summary.is_success());

        // Once a test inside fails, the suite's failure is the test's.
        container.mark_failed(&"4".into());
        let summary = RunSummary::new(&container);
        assert_eq!((summary.failed, summary.suite_failures), (1, 0));
    }

    /// Generates a sequence of parent choices: for node `i`, `None` means it
    /// is a root and `Some(j)` (with `j < i`) means its parent is node `j`.
    fn parent_choices() -> impl Strategy<Value = Vec<Option<usize>>> {
        prop::collection::vec(any::<Option<prop::sample::Index>>(), 1..64).prop_map(|choices| {
            choices
                .into_iter()
                .enumerate()
                .map(|(i, choice)| match choice {
                    Some(index) if i > 0 => Some(index.index(i)),
                    _ => None,
                })
                .collect()
        })
    }

    #[proptest(cases = 64)]
    fn every_node_reachable_from_exactly_one_root(
        #[strategy(parent_choices())] parents: Vec<Option<usize>>,
    ) {
        let mut container = TestContainer::new();
        for (i, parent) in parents.iter().enumerate() {
            let id = i.to_string();
            // Roots use the runner's self-referential encoding.
            let parent_id = parent.map_or_else(|| id.clone(), |p| p.to_string());
            container.insert(TestDeclaration {
                parent_id: Some(TestId::new(&parent_id)),
                ..TestDeclaration::leaf(TestId::new(&id), id.clone())
            });
        }

        prop_assert_eq!(container.len(), parents.len());

        let mut seen = vec![0usize; parents.len()];
        for (_, test) in container.walk() {
            let index = container.index_of(test.id()).unwrap();
            seen[index.0] += 1;
        }
        prop_assert!(seen.iter().all(|&count| count == 1));

        for (i, parent) in parents.iter().enumerate() {
            let test = container.get(&TestId::new(i.to_string())).unwrap();
            let expected = parent.map(|p| container.index_of(&TestId::new(p.to_string())).unwrap());
            prop_assert_eq!(test.parent(), expected);
        }
    }

    #[proptest(cases = 64)]
    fn failure_reaches_every_ancestor(
        #[strategy(parent_choices())] parents: Vec<Option<usize>>,
        #[strategy(any::<prop::sample::Index>())] leaf: prop::sample::Index,
    ) {
        let mut container = TestContainer::new();
        for (i, parent) in parents.iter().enumerate() {
            container.insert(TestDeclaration {
                parent_id: parent.map(|p| TestId::new(p.to_string())),
                ..TestDeclaration::leaf(TestId::new(i.to_string()), i.to_string())
            });
        }

        let leaf = leaf.index(parents.len());
        container.mark_failed(&TestId::new(leaf.to_string()));

        let mut ancestors = vec![leaf];
        let mut current = parents[leaf];
        while let Some(parent) = current {
            ancestors.push(parent);
            current = parents[parent];
        }

        for (i, test) in container.iter().enumerate() {
            prop_assert_eq!(test.is_failed(), ancestors.contains(&i));
        }
    }
}
