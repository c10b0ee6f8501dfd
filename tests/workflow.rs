// ABOUTME: Integration tests for the full deployment workflow against a simulated host.
// ABOUTME: Covers step ordering, re-runs, cluster modes, monitoring and aborts.

mod support;

use std::time::Duration;

use spandex::properties::{
    ClusterMode, DeployOptions, Master, MonitoringConfig, ProvisioningProperties,
};
use spandex::remote::Remote;
use spandex::workflow::{
    DeployErrorKind, DeploymentContext, Paths, Readiness, SettleConfig, Step, StepStatus,
    plugin_start_command, run_deployment, wait_until_ready,
};
use support::fake_host::FakeHost;

const HOST: &str = "ec2-54-1-2-3.us-west-2.compute.amazonaws.com";
const MARKER: &str = "/etc/puppet/.couchdb.deployed";
const REPLICATION: &str = "/usr/bin/python /usr/local/sbin/database_replication.py";

fn settle() -> SettleConfig {
    SettleConfig {
        fallback: Duration::from_secs(10),
        ..SettleConfig::immediate()
    }
}

fn context(properties: ProvisioningProperties, options: DeployOptions) -> DeploymentContext {
    DeploymentContext::new("ubuntu", HOST, properties, options).with_settle(settle())
}

fn standalone() -> DeploymentContext {
    context(ProvisioningProperties::default(), DeployOptions::default())
}

fn master() -> Master {
    Master {
        hostname: "couch-master".to_string(),
        ip: "10.0.0.5".to_string(),
    }
}

/// Direct runs of the replication script, not writes that mention it.
fn replication_runs(host: &FakeHost) -> usize {
    host.lines().iter().filter(|l| *l == REPLICATION).count()
}

mod standalone {
    use super::*;

    #[tokio::test]
    async fn fresh_host_runs_every_step_in_order() {
        support::init_tracing();
        let host = FakeHost::ubuntu();
        let report = run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        let steps: Vec<Step> = report.steps.iter().map(|r| r.step).collect();
        assert_eq!(
            steps,
            vec![
                Step::PrepareHost,
                Step::InstallAgent,
                Step::UpdateModule,
                Step::ApplyModule,
                Step::SetupDatabase,
                Step::Replicate,
                Step::ConfigureMonitoring,
                Step::ConfigureBoot,
                Step::Finish,
            ]
        );
        assert_eq!(report.host, HOST);
        assert!(report.changed(Step::InstallAgent));
        assert!(report.changed(Step::ConfigureBoot));
        assert!(host.exists("/usr/bin/puppet"));
        assert!(host.exists("/home/ubuntu"));
        assert!(host.exists(MARKER));
    }

    #[tokio::test]
    async fn replication_and_monitoring_are_skipped() {
        let host = FakeHost::ubuntu();
        let report = run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        assert_eq!(report.status(Step::Replicate), Some(StepStatus::Skipped));
        assert_eq!(
            report.status(Step::ConfigureMonitoring),
            Some(StepStatus::Skipped)
        );
        assert!(!host.ran("database_replication.py"));
        assert!(!host.ran("nrsysmond"));
    }

    #[tokio::test]
    async fn module_is_applied_with_the_host_name() {
        let host = FakeHost::ubuntu();
        run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        let apply = host
            .executed()
            .into_iter()
            .find(|e| e.line.starts_with("puppet apply"))
            .expect("puppet apply was issued");
        assert!(apply.privileged);
        assert!(apply.line.contains("couchdb_hostname"));
        assert!(apply.line.contains(HOST));
        assert!(!apply.line.contains("couchdb_master_ip"));
    }

    #[tokio::test]
    async fn setup_script_runs_with_both_flags_by_default() {
        let host = FakeHost::ubuntu();
        run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        assert!(host.ran("/usr/local/sbin/couchdb_setup.py -setup-database -flush"));
    }

    #[tokio::test]
    async fn setup_toggles_drop_their_flags() {
        let host = FakeHost::ubuntu();
        let options = DeployOptions {
            setup_database: false,
            flush_database: false,
            monitoring: None,
        };
        let ctx = context(ProvisioningProperties::default(), options);
        run_deployment(&Remote::new(&host), ctx).await.unwrap();

        assert!(host.ran("/usr/local/sbin/couchdb_setup.py"));
        assert!(!host.ran("-setup-database"));
        assert!(!host.ran("-flush"));
    }

    #[tokio::test]
    async fn database_dir_is_created_when_requested() {
        let host = FakeHost::ubuntu();
        let properties = ProvisioningProperties {
            database_dir: Some("/mnt/couchdb".to_string()),
            ..Default::default()
        };
        let report = run_deployment(
            &Remote::new(&host),
            context(properties, DeployOptions::default()),
        )
        .await
        .unwrap();

        assert!(host.exists("/mnt/couchdb"));
        assert!(report.changed(Step::PrepareHost));
    }

    #[tokio::test]
    async fn custom_paths_are_honoured() {
        let host = FakeHost::ubuntu();
        let paths = Paths {
            marker: "/var/lib/couch.deployed".to_string(),
            ..Paths::default()
        };
        run_deployment(&Remote::new(&host), standalone().with_paths(paths))
            .await
            .unwrap();

        assert!(host.exists("/var/lib/couch.deployed"));
        assert!(!host.exists(MARKER));
    }
}

mod boot_script {
    use super::*;

    #[tokio::test]
    async fn stock_rc_local_is_amended_and_backed_up() {
        let host = FakeHost::ubuntu();
        run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        assert_eq!(
            host.file("/etc/rc.local").as_deref(),
            Some("#!/bin/sh -e\n\ncd /etc/puppet/modules/couchdb\nsleep 10\n\nexit 0\n")
        );
        assert_eq!(
            host.file("/etc/rc.local.bak").as_deref(),
            Some("#!/bin/sh -e\n#\n# rc.local\n#\nexit 0\n")
        );
        assert!(host.ran("chmod 755 '/etc/rc.local'"));
    }

    #[tokio::test]
    async fn second_run_leaves_boot_script_and_marker_alone() {
        let host = FakeHost::ubuntu();
        let remote = Remote::new(&host);

        run_deployment(&remote, standalone()).await.unwrap();
        let boot = host.file("/etc/rc.local");
        let marker = host.file(MARKER);
        host.clear_log();

        let report = run_deployment(&remote, standalone()).await.unwrap();

        assert_eq!(
            report.status(Step::ConfigureBoot),
            Some(StepStatus::Skipped)
        );
        assert_eq!(report.status(Step::Finish), Some(StepStatus::Unchanged));
        assert_eq!(
            report.status(Step::InstallAgent),
            Some(StepStatus::Unchanged)
        );
        assert_eq!(host.file("/etc/rc.local"), boot);
        assert_eq!(host.file(MARKER), marker);
        assert_eq!(host.count("> '/etc/rc.local'"), 0);
        assert_eq!(host.count("> '/etc/rc.local.bak'"), 0);
        assert!(!host.ran("apt-get"));
    }

    #[tokio::test]
    async fn second_run_pulls_the_clean_checkout() {
        let host = FakeHost::ubuntu();
        let remote = Remote::new(&host);
        run_deployment(&remote, standalone()).await.unwrap();
        host.clear_log();

        let report = run_deployment(&remote, standalone()).await.unwrap();

        assert!(host.ran("git pull"));
        assert!(!host.ran("git clone"));
        assert!(report.changed(Step::UpdateModule));
    }

    #[tokio::test]
    async fn masterless_node_replicates_on_boot() {
        let host = FakeHost::ubuntu();
        let properties = ProvisioningProperties {
            cluster: ClusterMode::Masterless(master()),
            ..Default::default()
        };
        let report = run_deployment(
            &Remote::new(&host),
            context(properties, DeployOptions::default()),
        )
        .await
        .unwrap();

        assert!(report.changed(Step::Replicate));
        assert_eq!(replication_runs(&host), 1);
        let boot = host.file("/etc/rc.local").unwrap();
        assert!(boot.contains(&format!("sleep 10\n{REPLICATION}\n")));
        assert!(boot.ends_with("\nexit 0\n"));
    }

    #[tokio::test]
    async fn slave_node_replicates_once_but_not_on_boot() {
        let host = FakeHost::ubuntu();
        let properties = ProvisioningProperties {
            cluster: ClusterMode::Slave(master()),
            ..Default::default()
        };
        run_deployment(
            &Remote::new(&host),
            context(properties, DeployOptions::default()),
        )
        .await
        .unwrap();

        assert_eq!(replication_runs(&host), 1);
        assert!(!host.file("/etc/rc.local").unwrap().contains(REPLICATION));
    }

    #[tokio::test]
    async fn missing_rc_local_is_created_with_shebang_and_no_backup() {
        let host = FakeHost::new();
        run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        let boot = host.file("/etc/rc.local").unwrap();
        assert!(boot.starts_with("#!/bin/sh -e\n"));
        assert_eq!(
            boot,
            "#!/bin/sh -e\n\ncd /etc/puppet/modules/couchdb\nsleep 10\n\nexit 0\n"
        );
        assert!(!host.exists("/etc/rc.local.bak"));
    }
}

mod monitoring {
    use super::*;

    fn monitored() -> DeploymentContext {
        let options = DeployOptions {
            monitoring: Some(MonitoringConfig {
                license_key: "abc123".to_string(),
            }),
            ..Default::default()
        };
        context(ProvisioningProperties::default(), options)
    }

    #[tokio::test]
    async fn daemon_and_plugin_are_installed_licensed_and_started() {
        let host = FakeHost::ubuntu();
        let report = run_deployment(&Remote::new(&host), monitored())
            .await
            .unwrap();

        assert!(report.changed(Step::ConfigureMonitoring));
        assert!(host.exists("/usr/sbin/nrsysmond"));
        assert!(host.exists("/usr/local/bin/newrelic_plugin_agent"));

        let lines = host.lines();
        let position = |needle: &str| {
            lines
                .iter()
                .position(|l| l.contains(needle))
                .unwrap_or_else(|| panic!("{needle} was not run"))
        };
        let license = position("nrsysmond-config --set license_key='abc123'");
        let daemon = position("/etc/init.d/newrelic-sysmond start");
        let pip = position("apt-get -y install gcc python-dev python-pip");
        let plugin = position("pip install newrelic-plugin-agent");
        let start = position(&plugin_start_command());
        assert!(license < daemon);
        assert!(daemon < pip);
        assert!(pip < plugin);
        assert!(plugin < start);
    }

    #[tokio::test]
    async fn plugin_start_is_added_to_the_boot_script() {
        let host = FakeHost::ubuntu();
        run_deployment(&Remote::new(&host), monitored())
            .await
            .unwrap();

        let boot = host.file("/etc/rc.local").unwrap();
        assert!(boot.contains(&format!("{}\n", plugin_start_command())));
    }

    #[tokio::test]
    async fn running_daemon_is_restarted() {
        let host = FakeHost::ubuntu()
            .with_file("/usr/sbin/nrsysmond", "")
            .with_process(311, "/usr/sbin/nrsysmond -c /etc/newrelic/nrsysmond.cfg");
        run_deployment(&Remote::new(&host), monitored())
            .await
            .unwrap();

        assert!(host.ran("kill -9 311"));
        assert!(!host.ran("apt-get -y install newrelic-sysmond"));
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn failed_apply_aborts_remaining_steps() {
        let host = FakeHost::ubuntu().fail_on("puppet apply", 1);
        let err = run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Apply);
        assert_eq!(err.step(), Step::ApplyModule);
        assert_eq!(host.count("puppet apply"), 1);
        assert!(!host.ran("couchdb_setup.py"));
        assert!(!host.exists(MARKER));
        assert!(!host.exists("/etc/rc.local.bak"));
    }

    #[tokio::test]
    async fn failed_install_names_its_step() {
        let host = FakeHost::ubuntu().fail_on("dpkg -i", 1);
        let err = run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::RemoteCommand);
        assert_eq!(err.step(), Step::InstallAgent);
        assert!(err.to_string().starts_with("install-agent failed"));
        assert!(!host.ran("git clone"));
    }

    #[tokio::test]
    async fn failed_setup_script_stops_before_boot() {
        let host = FakeHost::ubuntu().fail_on("couchdb_setup.py", 2);
        let err = run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Step::SetupDatabase);
        assert_eq!(host.file("/etc/rc.local.bak"), None);
    }

    #[tokio::test]
    async fn unready_database_still_runs_setup() {
        let host = FakeHost::ubuntu().not_ready();
        let report = run_deployment(&Remote::new(&host), standalone())
            .await
            .unwrap();

        assert!(report.changed(Step::SetupDatabase));
        assert!(host.ran("couchdb_setup.py"));
    }
}

mod readiness {
    use super::*;

    #[tokio::test]
    async fn ready_database_answers_first_probe() {
        let host = FakeHost::new();
        let readiness = wait_until_ready(&Remote::new(&host), &SettleConfig::immediate())
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Ready { attempts: 1 });
        assert!(host.ran("curl -sf -o /dev/null 'http://127.0.0.1:5984/'"));
    }

    #[tokio::test]
    async fn timeout_is_reported_not_raised() {
        let host = FakeHost::new().not_ready();
        let readiness = wait_until_ready(&Remote::new(&host), &SettleConfig::immediate())
            .await
            .unwrap();

        assert!(matches!(readiness, Readiness::TimedOut { attempts: 1 }));
    }

    #[tokio::test]
    async fn probe_is_retried_until_ready() {
        let host = FakeHost::new().fail_times("curl", 7, 2);
        let settle = SettleConfig {
            timeout: Duration::from_secs(5),
            ..SettleConfig::immediate()
        };
        let readiness = wait_until_ready(&Remote::new(&host), &settle)
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Ready { attempts: 3 });
    }

    #[tokio::test]
    async fn zero_backoff_still_grows_between_probes() {
        let host = FakeHost::new().not_ready();
        let settle = SettleConfig {
            timeout: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            ..SettleConfig::immediate()
        };
        let readiness = wait_until_ready(&Remote::new(&host), &settle)
            .await
            .unwrap();

        // 1ms doubling reaches 100ms in about eight probes
        match readiness {
            Readiness::TimedOut { attempts } => assert!(attempts <= 12, "{attempts} probes"),
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_probe_sleeps_the_fallback() {
        let host = FakeHost::new();
        let settle = SettleConfig {
            probe: None,
            ..SettleConfig::immediate()
        };
        let readiness = wait_until_ready(&Remote::new(&host), &settle)
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Slept(Duration::ZERO));
        assert!(host.executed().is_empty());
    }
}
