// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end sessions over real loopback connections.

use indoc::indoc;
use pretty_assertions::assert_eq;
use remote_test_report::{
    config::ReportConfig,
    launch::{JunitLaunchArguments, testng_runner_args},
    listener::{NoopObserver, ResultListener, RunReport},
    model::{RunSummary, TestId},
    protocol::ProtocolKind,
};
use std::{net::Ipv4Addr, time::Duration};
use tokio::{io::AsyncWriteExt, net::TcpStream};

/// Plays the part of a test runner: connects to `port`, sends `input` in
/// small chunks so lines straddle reads, then closes the connection.
async fn run_session(protocol: ProtocolKind, input: &str) -> RunReport {
    let listener = ResultListener::open(protocol, ReportConfig::default_config()).unwrap();
    let port = listener.port();
    let handle = listener.spawn(NoopObserver);

    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
    for chunk in input.as_bytes().chunks(7) {
        stream.write_all(chunk).await.unwrap();
    }
    stream.shutdown().await.unwrap();
    drop(stream);

    handle.wait().await.unwrap()
}

#[tokio::test]
async fn junit_session() {
    let report = run_session(
        ProtocolKind::Junit,
        indoc! {"
            %TESTC  2 v2
            %TSTTREE1,com.example.AppTest,true,2,false,1,AppTest,,
            %TSTTREE2,adds(com.example.AppTest),false,1,false,1,adds(),,
            %TSTTREE3,divides(com.example.AppTest),false,1,false,1,divides(),,
            %TESTS  2,adds(com.example.AppTest)
            %TESTE  2,adds(com.example.AppTest)
            %TESTS  3,divides(com.example.AppTest)
            %ERROR  3,divides(com.example.AppTest)
            %TRACES
            java.lang.ArithmeticException: / by zero
            \tat com.example.App.divide(App.java:7)
            \tat sun.reflect.NativeMethodAccessorImpl.invoke0(Native Method)
            \tat org.eclipse.jdt.internal.junit4.runner.JUnit4TestReference.run(JUnit4TestReference.java:93)
            %TRACEE
            %TESTE  3,divides(com.example.AppTest)
            %RUNTIME87
        "},
    )
    .await;

    assert_eq!(
        report.summary,
        RunSummary {
            tests: 2,
            passed: 1,
            failed: 1,
            skipped: 0,
            assumption_failures: 0,
            suite_failures: 0,
        }
    );
    assert_eq!(report.run.elapsed, Some(Duration::from_millis(87)));

    let divides = report.run.container.get(&TestId::from("3")).unwrap();
    assert_eq!(
        divides.trace(),
        "java.lang.ArithmeticException: / by zero\n\tat com.example.App.divide(App.java:7)\n"
    );
    assert!(
        report
            .run
            .container
            .get(&TestId::from("1"))
            .unwrap()
            .is_failed()
    );

    assert!(report.text.starts_with("# Test Results\n"));
    assert!(report.text.contains("\n- ✘ AppTest (suite)\n  - ✔ adds()\n  - ✘ divides()\n"));
    assert!(report.text.ends_with("Ran 2 tests: 1 passed, 1 failed, 0 skipped\nTotal time: 87 ms\n"));
}

#[tokio::test]
async fn testng_session() {
    let report = run_session(
        ProtocolKind::Testng,
        indoc! {r#"
            [TestNG] Running:
            @@<TestRunner-{"name":"testStarted","attributes":{"name":"com.example.AppTest#adds"}}-TestRunner>
            @@<TestRunner-{"name":"testFinished","attributes":{"name":"com.example.AppTest#adds","duration":"12"}}-TestRunner>
            @@<TestRunner-{"name":"testStarted","attributes":{"name":"com.example.AppTest#divides"}}-TestRunner>
            @@<TestRunner-{"name":"testFailed","attributes":{"name":"com.example.AppTest#divides","message":"/ by zero","trace":"java.lang.ArithmeticException: / by zero\n\tat org.testng.internal.MethodInvocationHelper.invokeMethod(MethodInvocationHelper.java:1)\n","duration":"3"}}-TestRunner>
            ===============================================
        "#},
    )
    .await;

    assert_eq!(report.summary.tests, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.run.container.roots().len(), 2);

    let divides = report
        .run
        .container
        .get(&TestId::from("com.example.AppTest#divides"))
        .unwrap();
    assert_eq!(divides.message(), Some("/ by zero"));
    assert_eq!(divides.trace(), "java.lang.ArithmeticException: / by zero\n");
    assert_eq!(divides.runtime(), Some(Duration::from_millis(3)));
}

#[tokio::test]
async fn crlf_trace_lines_are_kept_verbatim() {
    let report = run_session(
        ProtocolKind::Junit,
        "%TSTTREE1,t,false,1,false,1,,,\r\n\
         %TESTS  1,t\r\n\
         %FAILED 1,t\r\n\
         %TRACES \r\n\
         LINE1\r\n\
         LINE2\r\n\
         %TRACEE \r\n\
         %TESTE  1,t\r\n",
    )
    .await;

    let t = report.run.container.get(&TestId::from("1")).unwrap();
    assert_eq!(t.trace(), "LINE1\r\nLINE2\r\n");
    assert!(t.is_failed());
}

#[tokio::test]
async fn runner_disconnects_mid_run() {
    let report = run_session(
        ProtocolKind::Junit,
        indoc! {"
            %TSTTREE1,Suite,true,2,false,1,,,
            %TSTTREE2,first,false,1,false,1,,,
            %TSTTREE3,second,false,1,false,1,,,
            %TESTS  2,first
            %TRACES
            partial
        "},
    )
    .await;

    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.run.elapsed, None);
    assert!(report.text.contains("  - ✔ second (skipped)\n"));
    assert!(!report.text.contains("Total time"));
}

#[tokio::test]
async fn launch_arguments_carry_the_port() {
    let listener =
        ResultListener::open(ProtocolKind::Junit, ReportConfig::default_config()).unwrap();
    let port = listener.port();

    let args = JunitLaunchArguments {
        main_class: "org.eclipse.jdt.internal.junit.runner.RemoteTestRunner".to_owned(),
        project_name: "app".to_owned(),
        working_directory: "/work/app".into(),
        classpath: Vec::new(),
        modulepath: Vec::new(),
        vm_arguments: Vec::new(),
        program_arguments: vec!["-port".to_owned(), "0".to_owned()],
    }
    .with_port(port)
    .unwrap();
    assert_eq!(args.program_arguments[1], port.to_string());

    let testng = testng_runner_args(port, ["app@com.example.AppTest#adds"]);
    assert_eq!(testng[0], port.to_string());

    // The port stays reserved until a runner connects.
    assert!(std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_err());
}
