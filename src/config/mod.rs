//! Layered configuration: CLI flags over environment over the YAML file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;

pub const ENV_ORG_URL: &str = "HIPPO_ADO_ORG_URL";
pub const ENV_PROJECT: &str = "HIPPO_ADO_PROJECT";
pub const ENV_TEAM: &str = "HIPPO_ADO_TEAM";

/// On-disk schema of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub config_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            organization_url: None,
            project: None,
            team: None,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub organization_url: Option<String>,
    pub project: Option<String>,
    pub team: Option<String>,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    Env,
    File,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::File => "file",
            Self::Default => "default",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub value: String,
    pub source: Source,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub organization_url: Setting,
    pub project: Setting,
    pub team: Setting,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} has config_version {found}, but this build supports {expected}. Run `hippo --init` to recreate it", .path.display())]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("{0} is not configured. Run `hippo --init`, pass it as a flag, or set {1}")]
    Missing(&'static str, &'static str),
    #[error("invalid organization URL {0:?}: {1}")]
    InvalidUrl(String, String),
    #[error("could not determine the user config directory")]
    NoConfigDir,
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join("hippo");
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.yaml"))
}

/// Read the config file. A missing file is not an error.
pub fn load_file(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    if let Some(warning) = permission_warning(path)? {
        eprintln!("warning: {warning}");
        tracing::warn!("{}", warning);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let file: FileConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    if file.config_version != CONFIG_VERSION {
        return Err(ConfigError::VersionMismatch {
            path: path.to_path_buf(),
            found: file.config_version,
            expected: CONFIG_VERSION,
        }
        .into());
    }

    Ok(Some(file))
}

/// Warning text when the file mode is anything but 0600.
#[cfg(unix)]
pub fn permission_warning(path: &Path) -> Result<Option<String>> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions()
        .mode()
        & 0o777;
    Ok((mode != 0o600).then(|| {
        format!(
            "{} has permissions {:o}; expected 600 (chmod 600 {})",
            path.display(),
            mode,
            path.display()
        )
    }))
}

#[cfg(not(unix))]
pub fn permission_warning(_path: &Path) -> Result<Option<String>> {
    Ok(None)
}

/// Merge the layers, highest precedence first: flag, env, file.
pub fn resolve(
    flags: &Overrides,
    env: impl Fn(&str) -> Option<String>,
    file: Option<&FileConfig>,
) -> Result<Config, ConfigError> {
    let pick = |flag: &Option<String>, var: &str, from_file: Option<&String>| {
        let present = |v: &String| !v.trim().is_empty();
        if let Some(value) = flag.as_ref().filter(|v| present(*v)) {
            return Some(Setting {
                value: value.trim().to_string(),
                source: Source::Flag,
            });
        }
        if let Some(value) = env(var).filter(present) {
            return Some(Setting {
                value: value.trim().to_string(),
                source: Source::Env,
            });
        }
        from_file.filter(|v| present(*v)).map(|value| Setting {
            value: value.trim().to_string(),
            source: Source::File,
        })
    };

    let organization_url = pick(
        &flags.organization_url,
        ENV_ORG_URL,
        file.and_then(|f| f.organization_url.as_ref()),
    )
    .ok_or(ConfigError::Missing("organization URL", ENV_ORG_URL))?;
    let organization_url = Setting {
        value: validate_org_url(&organization_url.value)?,
        source: organization_url.source,
    };

    let project = pick(
        &flags.project,
        ENV_PROJECT,
        file.and_then(|f| f.project.as_ref()),
    )
    .ok_or(ConfigError::Missing("project", ENV_PROJECT))?;

    let team = pick(&flags.team, ENV_TEAM, file.and_then(|f| f.team.as_ref()))
        .unwrap_or_else(|| Setting {
            value: format!("{} Team", project.value),
            source: Source::Default,
        });

    Ok(Config {
        organization_url,
        project,
        team,
    })
}

/// Load the file (default location unless `path` is given) and resolve
/// against flags and the process environment.
pub fn load(path: Option<&Path>, flags: &Overrides) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    let file = load_file(&path)?;
    let config = resolve(flags, |var| std::env::var(var).ok(), file.as_ref())?;
    tracing::info!(
        "Config: org={} ({}), project={} ({}), team={} ({})",
        config.organization_url.value,
        config.organization_url.source,
        config.project.value,
        config.project.source,
        config.team.value,
        config.team.source
    );
    Ok(config)
}

/// Accept `http`/`https` URLs only; trailing slashes are dropped.
pub fn validate_org_url(input: &str) -> Result<String, ConfigError> {
    let trimmed = input.trim();
    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| ConfigError::InvalidUrl(trimmed.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(
            trimmed.to_string(),
            "expected an http(s) URL such as https://dev.azure.com/my-org".to_string(),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Write atomically: temp file in the same directory, chmod 600, rename.
pub fn save(path: &Path, config: &FileConfig) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let content = serde_yaml::to_string(config)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
    }

    tmp.persist(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    current: Option<&str>,
) -> Result<Option<String>> {
    match current {
        Some(c) => write!(output, "{label} [{c}]: ")?,
        None => write!(output, "{label}: ")?,
    }
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim();
    Ok(Some(if line.is_empty() {
        current.unwrap_or("").to_string()
    } else {
        line.to_string()
    }))
}

/// Prompt for every setting, re-asking until the answer is valid.
///
/// Returns `None` when input ends before the wizard completes.
pub fn run_wizard<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    existing: Option<&FileConfig>,
) -> Result<Option<FileConfig>> {
    let organization_url = loop {
        let current = existing.and_then(|e| e.organization_url.as_deref());
        let Some(answer) = prompt(input, output, "Organization URL", current)? else {
            return Ok(None);
        };
        match validate_org_url(&answer) {
            Ok(url) => break url,
            Err(e) => writeln!(output, "  {e}")?,
        }
    };

    let project = loop {
        let current = existing.and_then(|e| e.project.as_deref());
        let Some(answer) = prompt(input, output, "Project", current)? else {
            return Ok(None);
        };
        if answer.is_empty() {
            writeln!(output, "  Project must not be empty")?;
        } else {
            break answer;
        }
    };

    let default_team = format!("{project} Team");
    let current_team = existing
        .and_then(|e| e.team.as_deref())
        .unwrap_or(&default_team);
    let Some(team) = prompt(input, output, "Team", Some(current_team))? else {
        return Ok(None);
    };

    Ok(Some(FileConfig {
        config_version: CONFIG_VERSION,
        organization_url: Some(organization_url),
        project: Some(project),
        team: Some(team),
    }))
}

/// Interactive `--init`: prompt on stdin and save.
pub fn init_wizard(path: Option<&Path>) -> Result<()> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    println!("hippo configuration");
    println!("===================\n");

    // An unreadable or outdated file only supplies no defaults.
    let existing = load_file(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Ignoring existing config: {:#}", e);
        None
    });

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let Some(config) = run_wizard(&mut input, &mut output, existing.as_ref())? else {
        println!("\nAborted.");
        return Ok(());
    };

    save(&config_path, &config)?;
    println!("\nConfig saved to {}", config_path.display());
    println!("Run `hippo` to start.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn file(project: &str) -> FileConfig {
        FileConfig {
            organization_url: Some("https://dev.azure.com/org".to_string()),
            project: Some(project.to_string()),
            ..Default::default()
        }
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn test_precedence_flag_env_file() {
        let file = file("A");
        let flags = Overrides {
            project: Some("C".to_string()),
            ..Default::default()
        };

        let config = resolve(&flags, env(&[(ENV_PROJECT, "B")]), Some(&file)).unwrap();
        assert_eq!(config.project.value, "C");
        assert_eq!(config.project.source, Source::Flag);

        let config = resolve(&Overrides::default(), env(&[(ENV_PROJECT, "B")]), Some(&file))
            .unwrap();
        assert_eq!(config.project.value, "B");
        assert_eq!(config.project.source.to_string(), "env");

        let config = resolve(&Overrides::default(), env(&[]), Some(&file)).unwrap();
        assert_eq!(config.project.value, "A");
        assert_eq!(config.project.source.to_string(), "file");
    }

    #[test]
    fn test_team_defaults_from_project() {
        let config = resolve(&Overrides::default(), env(&[]), Some(&file("Web"))).unwrap();
        assert_eq!(config.team.value, "Web Team");
        assert_eq!(config.team.source, Source::Default);
    }

    #[test]
    fn test_missing_project_is_error() {
        let file = FileConfig {
            organization_url: Some("https://dev.azure.com/org".to_string()),
            ..Default::default()
        };
        let err = resolve(&Overrides::default(), env(&[]), Some(&file)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("project", _)));
    }

    #[test]
    fn test_validate_org_url() {
        assert_eq!(
            validate_org_url(" https://dev.azure.com/org/ ").unwrap(),
            "https://dev.azure.com/org"
        );
        assert!(validate_org_url("dev.azure.com/org").is_err());
        assert!(validate_org_url("ftp://dev.azure.com/org").is_err());
    }

    #[test]
    fn test_version_mismatch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "config_version: 2\nproject: A\n").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file(&dir.path().join("absent.yaml")).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_is_owner_only_and_round_trips() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = file("A");

        save(&path, &config).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(permission_warning(&path).unwrap().is_none());
        assert_eq!(load_file(&path).unwrap(), Some(config));
    }

    #[cfg(unix)]
    #[test]
    fn test_loose_permissions_warn() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "config_version: 1\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(permission_warning(&path).unwrap().is_some());
        // Loading proceeds anyway
        assert!(load_file(&path).unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_modes_other_than_600_warn() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "config_version: 1\n").unwrap();
        for mode in [0o400, 0o700] {
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
            let warning = permission_warning(&path).unwrap();
            assert!(warning.is_some_and(|w| w.contains("expected 600")), "mode {mode:o}");
        }
    }

    #[test]
    fn test_wizard_reprompts_invalid_input() {
        let mut input = Cursor::new("not a url\nhttps://dev.azure.com/org\n\nWeb\n\n");
        let mut output = Vec::new();
        let config = run_wizard(&mut input, &mut output, None).unwrap().unwrap();

        assert_eq!(config.organization_url.as_deref(), Some("https://dev.azure.com/org"));
        assert_eq!(config.project.as_deref(), Some("Web"));
        assert_eq!(config.team.as_deref(), Some("Web Team"));

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("invalid organization URL"));
        assert!(transcript.contains("Project must not be empty"));
    }

    #[test]
    fn test_wizard_aborts_on_eof() {
        let mut input = Cursor::new("https://dev.azure.com/org\n");
        let mut output = Vec::new();
        assert!(run_wizard(&mut input, &mut output, None).unwrap().is_none());
    }
}
