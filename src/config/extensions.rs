//! Extensions provide the variables config templates can reference. Each one only looks at the
//! raw config and its surroundings, and they are combined in a fixed order.

use std::{
    collections::BTreeMap,
    env,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{error::ConfigError, utils::clock::Clock};

use super::RawConfig;

/// Variable name to value. `None` marks a variable that exists but has no value here, like the git
/// branch outside of a repository.
pub type Variables = BTreeMap<String, Option<String>>;

/// Environment variables that may hold the login name, checked in this order.
const USER_VARIABLES: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// A named provider of template variables.
pub struct Extension {
    name: &'static str,
    provide: Box<dyn Fn(&RawConfig) -> Variables>,
}

impl Extension {
    pub fn new(name: &'static str, provide: impl Fn(&RawConfig) -> Variables + 'static) -> Self {
        Self {
            name,
            provide: Box::new(provide),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn variables(&self, config: &RawConfig) -> Variables {
        (self.provide)(config)
    }
}

/// Extensions used by the binaries, in the order they are applied.
pub fn standard_extensions(clock: Arc<dyn Clock>) -> Vec<Extension> {
    vec![
        Extension::new("config", config_paths),
        Extension::new("userspace", userspace),
        Extension::new("git", git),
        Extension::new("time", move |_| time(clock.as_ref())),
    ]
}

/// Runs every extension and merges the results. Two extensions providing the same variable is a
/// mistake in the extension list, and is reported instead of letting one silently win.
pub fn collect_variables(
    config: &RawConfig,
    extensions: &[Extension],
) -> Result<Variables, ConfigError> {
    extensions
        .iter()
        .try_fold(Variables::new(), |mut collected, extension| {
            for (name, value) in extension.variables(config) {
                if collected.contains_key(&name) {
                    return Err(ConfigError::VariableCollision {
                        name,
                        extension: extension.name(),
                    });
                }
                trace!("{} provides {name} = {value:?}", extension.name());
                collected.insert(name, value);
            }
            Ok(collected)
        })
}

pub fn config_paths(config: &RawConfig) -> Variables {
    let path = config.path();
    let dir = path.parent().unwrap_or(path);
    Variables::from([
        ("CONFIG_DIR".into(), Some(dir.display().to_string())),
        ("CONFIG_PATH".into(), Some(path.display().to_string())),
    ])
}

pub fn userspace(_: &RawConfig) -> Variables {
    Variables::from([
        (
            "HOME".into(),
            dirs::home_dir().map(|v| v.display().to_string()),
        ),
        ("USER".into(), user_name(|name| env::var(name).ok())),
    ])
}

/// First non-empty login name variable. Without any, the home directory's name is the best guess
/// left, which is what the account's passwd entry points to on most systems.
fn user_name(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    USER_VARIABLES
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
        .or_else(|| {
            dirs::home_dir()
                .and_then(|home| home.file_name().map(|v| v.to_string_lossy().to_string()))
        })
}

/// Git details of the repository next to the config, or the one `gitdir` points to.
pub fn git(config: &RawConfig) -> Variables {
    let gitdir = config
        .document()
        .get("gitdir")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            config
                .path()
                .parent()
                .unwrap_or(Path::new(""))
                .join(".git")
        });

    let toplevel = git_command(&gitdir, &["rev-parse", "--show-toplevel"]);
    let name = toplevel.as_deref().and_then(|toplevel| {
        Path::new(toplevel)
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
    });

    Variables::from([
        (
            "GITBRANCH".into(),
            git_command(&gitdir, &["branch", "--show-current"]),
        ),
        (
            "GITHASH".into(),
            git_command(&gitdir, &["rev-parse", "--short", "HEAD"]),
        ),
        (
            "GITHASHLONG".into(),
            git_command(&gitdir, &["rev-parse", "HEAD"]),
        ),
        ("GITNAME".into(), name),
    ])
}

/// Output of a git command, or `None` if git isn't there, fails, or prints nothing.
fn git_command(gitdir: &Path, args: &[&str]) -> Option<String> {
    let mut command = Command::new("git");
    command.arg("--git-dir").arg(gitdir);
    // Without an explicit work tree git would use the current directory.
    if let Some(work_tree) = gitdir.parent().filter(|v| !v.as_os_str().is_empty()) {
        command.arg("--work-tree").arg(work_tree);
    }
    let output = command
        .args(args)
        .output()
        .inspect_err(|e| debug!("Couldn't run git: {e}"))
        .ok()?;
    if !output.status.success() {
        trace!("git {args:?} in {gitdir:?} exited with {}", output.status);
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!stdout.is_empty()).then_some(stdout)
}

pub fn time(clock: &dyn Clock) -> Variables {
    let now = clock.time();
    Variables::from([
        (
            "NOW".into(),
            Some(now.format("%Y-%m-%dT%H:%M:%S").to_string()),
        ),
        ("TODAY".into(), Some(now.date().format("%Y-%m-%d").to_string())),
    ])
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use serde_json::json;
    use tempfile::tempdir;

    use crate::{
        config::RawConfig,
        error::ConfigError,
        utils::time::tests::test_clock,
    };

    use super::{
        collect_variables, config_paths, git, standard_extensions, time, user_name, userspace,
        Extension, Variables,
    };

    fn raw(path: &str) -> RawConfig {
        RawConfig::new(PathBuf::from(path), json!({}))
    }

    #[test]
    fn test_config_paths() {
        let variables = config_paths(&raw("/work/project/.trckr.json"));
        assert_eq!(variables["CONFIG_DIR"].as_deref(), Some("/work/project"));
        assert_eq!(
            variables["CONFIG_PATH"].as_deref(),
            Some("/work/project/.trckr.json")
        );
    }

    #[test]
    fn test_time_uses_clock() {
        let variables = time(&test_clock());
        assert_eq!(variables["NOW"].as_deref(), Some("2024-01-03T12:34:56"));
        assert_eq!(variables["TODAY"].as_deref(), Some("2024-01-03"));
    }

    #[test]
    fn test_user_name_fallback_order() {
        let env = |set: &'static [(&'static str, &'static str)]| {
            move |name: &str| {
                set.iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.to_string())
            }
        };
        assert_eq!(
            user_name(env(&[("USERNAME", "d"), ("USER", "b"), ("LOGNAME", "a")])).as_deref(),
            Some("a")
        );
        assert_eq!(
            user_name(env(&[("USERNAME", "d"), ("LNAME", "c"), ("USER", "b")])).as_deref(),
            Some("b")
        );
        assert_eq!(
            user_name(env(&[("USERNAME", "d"), ("LNAME", "c"), ("LOGNAME", "")])).as_deref(),
            Some("c")
        );
        assert_eq!(user_name(env(&[("USERNAME", "d")])).as_deref(), Some("d"));
    }

    #[test]
    fn test_user_without_variables_falls_back_to_home() {
        let expected = dirs::home_dir()
            .and_then(|home| home.file_name().map(|v| v.to_string_lossy().to_string()));
        assert_eq!(user_name(|_| None), expected);
    }

    #[test]
    fn test_userspace_home() {
        let variables = userspace(&raw("/tmp/.trckr.json"));
        assert_eq!(
            variables["HOME"],
            dirs::home_dir().map(|v| v.display().to_string())
        );
    }

    #[test]
    fn test_git_outside_repository_has_no_values() {
        let dir = tempdir().unwrap();
        let config = RawConfig::new(dir.path().join(".trckr.json"), json!({}));
        let variables = git(&config);
        for name in ["GITBRANCH", "GITHASH", "GITHASHLONG", "GITNAME"] {
            assert_eq!(variables.get(name), Some(&None), "{name} should be unset");
        }
    }

    #[test]
    fn test_standard_extensions_are_disjoint() {
        let extensions = standard_extensions(Arc::new(test_clock()));
        let names = extensions.iter().map(Extension::name).collect::<Vec<_>>();
        assert_eq!(names, ["config", "userspace", "git", "time"]);

        let variables = collect_variables(&raw("/tmp/.trckr.json"), &extensions).unwrap();
        for name in [
            "HOME", "USER", "CONFIG_DIR", "CONFIG_PATH", "NOW", "TODAY", "GITBRANCH", "GITHASH",
            "GITHASHLONG", "GITNAME",
        ] {
            assert!(variables.contains_key(name), "{name} is missing");
        }
    }

    #[test]
    fn test_collision_is_reported() {
        let extensions = vec![
            Extension::new("first", |_| Variables::from([("A".into(), Some("1".into()))])),
            Extension::new("second", |_| Variables::from([("A".into(), Some("2".into()))])),
        ];
        assert!(matches!(
            collect_variables(&raw("/tmp/.trckr.json"), &extensions),
            Err(ConfigError::VariableCollision { name, extension: "second" }) if name == "A"
        ));
    }
}
