//! Environment config resolution
//!
//! Merges the command line with the rc-file environments into the list of
//! environments a run operates on. The mode is fixed by the inputs:
//!
//! 1. **Explicit target**: `<env>` or `<env>:<pushTarget>` picks named rc
//!    entries; command-line values win per field.
//! 2. **Single environment**: the rc defines one environment; command-line
//!    values win per field.
//! 3. **Multiple environments**: command-line connection values
//!    (domain/username/password/app/guest) replace the rc entirely; otherwise
//!    every rc environment is used, layered over the command-line values.
//!    Write operations refuse to fan out and require an explicit target.

use crate::domain::descriptor::Operation;
use crate::domain::layout::LocalLayout;
use crate::domain::AppSpec;
use crate::error::ConfigError;

use super::rc::EnvSettings;

/// One environment's merged settings, before credentials are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSpec {
    pub settings: EnvSettings,
    /// rc-only settings of the promotion target
    pub push_target: Option<Box<EnvSettings>>,
}

impl EnvironmentSpec {
    fn new(settings: EnvSettings) -> Self {
        Self {
            settings,
            push_target: None,
        }
    }
}

/// Where an environment's files live, without touching credentials
pub fn layout_of(settings: &EnvSettings) -> LocalLayout {
    LocalLayout {
        location: settings.location.clone(),
        env_location: settings.env_location.clone(),
        environment: settings.environment.clone(),
        file_type: settings.file_type.unwrap_or_default(),
    }
}

/// Resolve the environments for one run
pub fn resolve(
    operation: Operation,
    target: Option<&str>,
    cli: &EnvSettings,
    environments: &[EnvSettings],
) -> Result<Vec<EnvironmentSpec>, ConfigError> {
    if let Some(target) = target {
        return resolve_target(operation, target, cli, environments).map(|spec| vec![spec]);
    }

    if environments.len() <= 1 {
        let rc = environments.first().cloned().unwrap_or_default();
        return Ok(vec![EnvironmentSpec::new(cli.clone().merge(&rc))]);
    }

    if cli.identifies_environment() {
        return Ok(vec![EnvironmentSpec::new(cli.clone())]);
    }

    if operation.is_write() {
        return Err(ConfigError::AmbiguousTarget {
            operation: operation.name().to_string(),
        });
    }

    Ok(environments
        .iter()
        .map(|env| EnvironmentSpec::new(env.clone().merge(cli)))
        .collect())
}

fn find<'a>(environments: &'a [EnvSettings], name: &str) -> Result<&'a EnvSettings, ConfigError> {
    environments
        .iter()
        .find(|env| env.environment.as_deref() == Some(name))
        .ok_or_else(|| ConfigError::UnknownEnvironment {
            name: name.to_string(),
        })
}

fn resolve_target(
    operation: Operation,
    target: &str,
    cli: &EnvSettings,
    environments: &[EnvSettings],
) -> Result<EnvironmentSpec, ConfigError> {
    let (name, push_target) = match target.split_once(':') {
        Some((name, push_target)) => (name, Some(push_target)),
        None => (target, None),
    };

    if push_target.is_some() && !operation.allows_push_target() {
        return Err(ConfigError::PushTargetNotAllowed {
            operation: operation.name().to_string(),
        });
    }

    let env = find(environments, name)?;
    let Some(push_target) = push_target else {
        return Ok(EnvironmentSpec::new(cli.clone().merge(env)));
    };

    let target_env = find(environments, push_target)?;
    for side in [env, target_env] {
        if matches!(side.app, Some(AppSpec::Ids(_))) {
            return Err(ConfigError::AppMapNotDictionary {
                environment: side.environment.clone().unwrap_or_default(),
            });
        }
    }

    Ok(EnvironmentSpec {
        settings: cli.clone().merge(env),
        push_target: Some(Box::new(target_env.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str, domain: &str, app: &str) -> EnvSettings {
        EnvSettings {
            environment: Some(name.to_string()),
            domain: Some(domain.to_string()),
            app: Some(AppSpec::parse(app).unwrap()),
            ..Default::default()
        }
    }

    fn two_envs() -> Vec<EnvSettings> {
        vec![
            env("dev", "dev.cybozu.com", "orders=10"),
            env("prod", "prod.cybozu.com", "orders=20"),
        ]
    }

    #[test]
    fn test_single_environment_cli_wins_per_field() {
        let cli = EnvSettings {
            domain: Some("a.example.com".to_string()),
            ..Default::default()
        };
        let mut rc = env("dev", "b.example.com", "10");
        rc.username = Some("alice".to_string());

        let specs = resolve(Operation::Pull, None, &cli, &[rc]).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].settings.domain.as_deref(), Some("a.example.com"));
        assert_eq!(specs[0].settings.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_no_rc_uses_cli() {
        let cli = EnvSettings {
            domain: Some("a.example.com".to_string()),
            ..Default::default()
        };
        let specs = resolve(Operation::Push, None, &cli, &[]).unwrap();
        assert_eq!(specs[0].settings, cli);
    }

    #[test]
    fn test_multi_environment_expands_each() {
        let cli = EnvSettings {
            preview: Some(true),
            ..Default::default()
        };
        let specs = resolve(Operation::Pull, None, &cli, &two_envs()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].settings.domain.as_deref(), Some("dev.cybozu.com"));
        assert_eq!(specs[1].settings.domain.as_deref(), Some("prod.cybozu.com"));
        assert_eq!(specs[1].settings.app.as_ref().unwrap().to_map()["orders"].as_str(), "20");
        assert!(specs.iter().all(|s| s.settings.preview == Some(true)));
    }

    #[test]
    fn test_multi_environment_write_is_ambiguous() {
        for operation in [Operation::Push, Operation::Reset, Operation::Deploy] {
            let err = resolve(operation, None, &EnvSettings::default(), &two_envs()).unwrap_err();
            assert!(matches!(err, ConfigError::AmbiguousTarget { .. }));
        }
    }

    #[test]
    fn test_multi_environment_cli_connection_ignores_rc() {
        let cli = EnvSettings {
            app: Some(AppSpec::parse("99").unwrap()),
            ..Default::default()
        };
        let specs = resolve(Operation::Push, None, &cli, &two_envs()).unwrap();
        assert_eq!(specs.len(), 1);
        assert!(specs[0].settings.domain.is_none());
    }

    #[test]
    fn test_explicit_target() {
        let specs = resolve(Operation::Push, Some("prod"), &EnvSettings::default(), &two_envs()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].settings.environment.as_deref(), Some("prod"));

        let err = resolve(Operation::Pull, Some("staging"), &EnvSettings::default(), &two_envs()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment { .. }));
    }

    #[test]
    fn test_push_target() {
        let specs = resolve(Operation::Push, Some("dev:prod"), &EnvSettings::default(), &two_envs()).unwrap();
        let target = specs[0].push_target.as_ref().unwrap();
        assert_eq!(target.domain.as_deref(), Some("prod.cybozu.com"));

        let err = resolve(Operation::Deploy, Some("dev:prod"), &EnvSettings::default(), &two_envs()).unwrap_err();
        assert!(matches!(err, ConfigError::PushTargetNotAllowed { .. }));
    }

    #[test]
    fn test_push_target_requires_dictionaries() {
        let envs = vec![
            env("dev", "dev.cybozu.com", "10"),
            env("prod", "prod.cybozu.com", "orders=20"),
        ];
        let err = resolve(Operation::Push, Some("dev:prod"), &EnvSettings::default(), &envs).unwrap_err();
        assert!(matches!(err, ConfigError::AppMapNotDictionary { ref environment } if environment == "dev"));
    }

    #[test]
    fn test_layout_of() {
        let mut settings = env("dev", "dev.cybozu.com", "10");
        settings.location = Some("kintone".into());
        let layout = layout_of(&settings);
        assert_eq!(layout.base_dir(false), std::path::PathBuf::from("kintone/dev"));
    }
}
