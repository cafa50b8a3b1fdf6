//! Readiness and liveness probes
//!
//! Both probes share one check derived from the action's health check. Timings
//! are fixed: readiness polls every second for up to 90 attempts, and liveness
//! only starts once readiness has had that full window, so a slow-starting
//! process is never killed before it could have become ready.

use serde_json::Value;
use stevedore_common::spec::{ActionMode, HealthCheckSpec, PortSpec};
use stevedore_common::{Error, Result};

use crate::k8s::{Container, ExecAction, HttpGetAction, ProbeSpec, TcpSocketAction};

/// Readiness: delay before the first check
pub const READINESS_INITIAL_DELAY_SECONDS: i32 = 2;
/// Readiness: seconds between checks
pub const READINESS_PERIOD_SECONDS: i32 = 1;
/// Readiness: successes needed
pub const READINESS_SUCCESS_THRESHOLD: i32 = 2;
/// Readiness: failures tolerated
pub const READINESS_FAILURE_THRESHOLD: i32 = 90;

/// Liveness: seconds between checks
pub const LIVENESS_PERIOD_SECONDS: i32 = 5;
/// Liveness: seconds between checks while syncing
pub const SYNC_LIVENESS_PERIOD_SECONDS: i32 = 10;
/// Liveness: failures tolerated
pub const LIVENESS_FAILURE_THRESHOLD: i32 = 3;
/// Liveness: failures tolerated while syncing, so restarts after file changes are not fatal
pub const SYNC_LIVENESS_FAILURE_THRESHOLD: i32 = 30;

/// Probe timeout when the health check does not set one
pub const DEFAULT_PROBE_TIMEOUT_SECONDS: i32 = 3;

/// The single check both probes run
#[derive(Clone, Debug, PartialEq)]
enum ProbeCheck {
    Http(HttpGetAction),
    Exec(ExecAction),
    Tcp(TcpSocketAction),
}

impl ProbeCheck {
    fn into_probe(self, timings: ProbeTimings) -> ProbeSpec {
        let mut probe = ProbeSpec {
            http_get: None,
            exec: None,
            tcp_socket: None,
            initial_delay_seconds: timings.initial_delay,
            period_seconds: timings.period,
            timeout_seconds: timings.timeout,
            success_threshold: timings.success,
            failure_threshold: timings.failure,
        };
        match self {
            Self::Http(action) => probe.http_get = Some(action),
            Self::Exec(action) => probe.exec = Some(action),
            Self::Tcp(action) => probe.tcp_socket = Some(action),
        }
        probe
    }
}

#[derive(Clone, Copy, Debug)]
struct ProbeTimings {
    initial_delay: i32,
    period: i32,
    timeout: i32,
    success: i32,
    failure: i32,
}

/// Derives probes from a health check and the action mode
pub struct HealthProbeConfigurator;

impl HealthProbeConfigurator {
    /// Attach readiness and liveness probes to `container`.
    ///
    /// Does nothing in local mode. Fails when the health check has no check
    /// configured or names a port the action does not declare.
    pub fn configure(
        container: &mut Container,
        action: &str,
        health_check: &HealthCheckSpec,
        ports: &[PortSpec],
        mode: ActionMode,
    ) -> Result<()> {
        if mode == ActionMode::Local {
            return Ok(());
        }

        let check = Self::check(action, health_check, ports)?;

        let readiness = ProbeTimings {
            initial_delay: READINESS_INITIAL_DELAY_SECONDS,
            period: READINESS_PERIOD_SECONDS,
            timeout: effective_timeout(health_check.readiness_timeout_seconds),
            success: READINESS_SUCCESS_THRESHOLD,
            failure: READINESS_FAILURE_THRESHOLD,
        };

        let syncing = mode == ActionMode::Sync;
        let liveness = ProbeTimings {
            initial_delay: readiness.period * readiness.failure,
            period: if syncing {
                SYNC_LIVENESS_PERIOD_SECONDS
            } else {
                LIVENESS_PERIOD_SECONDS
            },
            timeout: effective_timeout(health_check.liveness_timeout_seconds),
            success: 1,
            failure: if syncing {
                SYNC_LIVENESS_FAILURE_THRESHOLD
            } else {
                LIVENESS_FAILURE_THRESHOLD
            },
        };

        container.readiness_probe = Some(check.clone().into_probe(readiness));
        container.liveness_probe = Some(check.into_probe(liveness));
        Ok(())
    }

    // HTTP takes precedence over exec, exec over TCP.
    fn check(
        action: &str,
        health_check: &HealthCheckSpec,
        ports: &[PortSpec],
    ) -> Result<ProbeCheck> {
        if let Some(http) = &health_check.http_get {
            return Ok(ProbeCheck::Http(HttpGetAction {
                path: http.path.clone(),
                port: resolve_port(action, ports, &http.port)?,
                scheme: http.scheme.clone(),
            }));
        }

        if let Some(command) = &health_check.command {
            return Ok(ProbeCheck::Exec(ExecAction {
                command: command.iter().map(command_token).collect(),
            }));
        }

        if let Some(port) = &health_check.tcp_port {
            return Ok(ProbeCheck::Tcp(TcpSocketAction {
                port: resolve_port(action, ports, port)?,
            }));
        }

        Err(Error::configuration(
            action,
            "Must specify type of health check when configuring health check.",
        ))
    }
}

fn effective_timeout(configured: Option<i32>) -> i32 {
    configured
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECONDS)
}

fn resolve_port(action: &str, ports: &[PortSpec], name: &str) -> Result<u16> {
    ports
        .iter()
        .rev()
        .find(|p| p.name == name)
        .map(|p| p.container_port)
        .ok_or_else(|| {
            Error::configuration(
                action,
                format!(
                    "health check references port '{}', which is not declared in ports",
                    name
                ),
            )
        })
}

fn command_token(token: &Value) -> String {
    match token {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use stevedore_common::spec::{HttpGetCheck, PortProtocol};

    fn container() -> Container {
        Container {
            name: "api".to_string(),
            image: "api:v1".to_string(),
            image_pull_policy: None,
            command: None,
            args: None,
            env: vec![],
            ports: None,
            resources: None,
            readiness_probe: None,
            liveness_probe: None,
            volume_mounts: None,
            security_context: None,
            tty: None,
            stdin: None,
        }
    }

    fn ports() -> Vec<PortSpec> {
        vec![PortSpec {
            name: "http".to_string(),
            protocol: PortProtocol::Tcp,
            container_port: 8080,
            host_port: None,
        }]
    }

    fn http_check() -> HealthCheckSpec {
        HealthCheckSpec {
            http_get: Some(HttpGetCheck {
                path: "/healthz".to_string(),
                port: "http".to_string(),
                scheme: None,
            }),
            ..Default::default()
        }
    }

    // =========================================================================
    // Story: probe timings
    // =========================================================================

    #[rstest]
    #[case::normal(ActionMode::Normal, 5, 3)]
    #[case::sync(ActionMode::Sync, 10, 30)]
    fn liveness_waits_for_readiness_window(
        #[case] mode: ActionMode,
        #[case] period: i32,
        #[case] failure: i32,
    ) {
        let mut c = container();
        HealthProbeConfigurator::configure(&mut c, "api", &http_check(), &ports(), mode).unwrap();

        let readiness = c.readiness_probe.unwrap();
        let liveness = c.liveness_probe.unwrap();
        assert_eq!(readiness.initial_delay_seconds, 2);
        assert_eq!(readiness.period_seconds, 1);
        assert_eq!(readiness.success_threshold, 2);
        assert_eq!(readiness.failure_threshold, 90);
        assert_eq!(
            liveness.initial_delay_seconds,
            readiness.period_seconds * readiness.failure_threshold
        );
        assert_eq!(liveness.initial_delay_seconds, 90);
        assert_eq!(liveness.period_seconds, period);
        assert_eq!(liveness.failure_threshold, failure);
        assert_eq!(liveness.success_threshold, 1);
    }

    #[rstest]
    #[case::unset(None, 3)]
    #[case::zero(Some(0), 3)]
    #[case::configured(Some(7), 7)]
    fn timeouts_fall_back_to_default(#[case] configured: Option<i32>, #[case] expected: i32) {
        let mut check = http_check();
        check.readiness_timeout_seconds = configured;
        check.liveness_timeout_seconds = configured;

        let mut c = container();
        HealthProbeConfigurator::configure(&mut c, "api", &check, &ports(), ActionMode::Normal)
            .unwrap();
        assert_eq!(c.readiness_probe.unwrap().timeout_seconds, expected);
        assert_eq!(c.liveness_probe.unwrap().timeout_seconds, expected);
    }

    #[test]
    fn local_mode_attaches_no_probes() {
        let mut c = container();
        HealthProbeConfigurator::configure(
            &mut c,
            "api",
            &http_check(),
            &ports(),
            ActionMode::Local,
        )
        .unwrap();
        assert!(c.readiness_probe.is_none());
        assert!(c.liveness_probe.is_none());
    }

    // =========================================================================
    // Story: exactly one check type
    // =========================================================================

    #[test]
    fn http_check_resolves_named_port() {
        let mut c = container();
        HealthProbeConfigurator::configure(
            &mut c,
            "api",
            &http_check(),
            &ports(),
            ActionMode::Normal,
        )
        .unwrap();
        let readiness = c.readiness_probe.unwrap();
        assert_eq!(readiness.http_get.as_ref().unwrap().port, 8080);
        assert_eq!(readiness.http_get.as_ref().unwrap().path, "/healthz");
        assert_eq!(readiness.check_count(), 1);
        assert_eq!(c.liveness_probe.unwrap().check_count(), 1);
    }

    #[test]
    fn http_wins_over_exec_and_tcp() {
        let mut check = http_check();
        check.command = Some(vec![json!("true")]);
        check.tcp_port = Some("http".to_string());

        let mut c = container();
        HealthProbeConfigurator::configure(&mut c, "api", &check, &ports(), ActionMode::Normal)
            .unwrap();
        let readiness = c.readiness_probe.unwrap();
        assert!(readiness.http_get.is_some());
        assert_eq!(readiness.check_count(), 1);
    }

    #[test]
    fn exec_tokens_become_strings() {
        let check = HealthCheckSpec {
            command: Some(vec![json!("check"), json!(3), json!(true)]),
            tcp_port: Some("http".to_string()),
            ..Default::default()
        };

        let mut c = container();
        HealthProbeConfigurator::configure(&mut c, "api", &check, &ports(), ActionMode::Normal)
            .unwrap();
        let readiness = c.readiness_probe.unwrap();
        assert_eq!(
            readiness.exec.unwrap().command,
            vec!["check".to_string(), "3".to_string(), "true".to_string()]
        );
        assert!(readiness.tcp_socket.is_none());
    }

    #[test]
    fn tcp_check_resolves_named_port() {
        let check = HealthCheckSpec {
            tcp_port: Some("http".to_string()),
            ..Default::default()
        };

        let mut c = container();
        HealthProbeConfigurator::configure(&mut c, "api", &check, &ports(), ActionMode::Sync)
            .unwrap();
        assert_eq!(c.liveness_probe.unwrap().tcp_socket.unwrap().port, 8080);
    }

    #[test]
    fn empty_health_check_is_a_configuration_error() {
        let mut c = container();
        let err = HealthProbeConfigurator::configure(
            &mut c,
            "api",
            &HealthCheckSpec::default(),
            &ports(),
            ActionMode::Normal,
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(c.readiness_probe.is_none());
    }

    #[test]
    fn unknown_port_is_a_configuration_error() {
        let check = HealthCheckSpec {
            tcp_port: Some("grpc".to_string()),
            ..Default::default()
        };
        let mut c = container();
        let err =
            HealthProbeConfigurator::configure(&mut c, "api", &check, &ports(), ActionMode::Normal)
                .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("grpc"));
    }
}
