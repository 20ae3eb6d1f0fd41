//! Platform command builder
//!
//! Maps a sanitized text plus a [`SpeechConfig`] to the exact external
//! invocation for the host's speech engine:
//! - macOS: `say`
//! - Linux: `espeak`, falling back to `festival` through `sh -c`
//! - Windows: `powershell` running a System.Speech script
//!
//! Building is pure; spawning is owned by the session manager.

use crate::config::SpeechConfig;
use crate::{Result, TtsError};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

/// Host platform families with a known speech backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Unsupported(String),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style name
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" | "darwin" => Platform::MacOs,
            "linux" => Platform::Linux,
            "windows" => Platform::Windows,
            other => Platform::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Unsupported(os) => os.as_str(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved engine invocation: program plus argv
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Command ready to spawn. Output is discarded and the child is killed if its
    /// handle is dropped.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for ExternalInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Resolves engine executables on the host
pub trait EngineLocator: Send + Sync {
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Searches the `PATH` environment variable
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl EngineLocator for PathLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        get_from_path(program)
    }
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    // If a path-like string is provided, respect it directly
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.is_file() { Some(p) } else { None };
    }

    let paths_os = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&paths_os) {
        let candidate = dir.join(bin);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

/// Turns text + config into an engine invocation
pub trait CommandBuilder: Send + Sync {
    fn build(&self, text: &str, config: &SpeechConfig) -> Result<ExternalInvocation>;
}

/// Production builder: per-platform argument/script mapping
pub struct PlatformCommandBuilder {
    platform: Platform,
    locator: Box<dyn EngineLocator>,
}

impl PlatformCommandBuilder {
    pub fn new(platform: Platform, locator: Box<dyn EngineLocator>) -> Self {
        Self { platform, locator }
    }

    /// Builder for the running host, searching `PATH`
    pub fn detect() -> Self {
        Self::new(Platform::current(), Box::new(PathLocator))
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    fn linux_command(&self, text: &str, config: &SpeechConfig) -> Result<ExternalInvocation> {
        if self.locator.locate("espeak").is_some() {
            return Ok(espeak_command(text, config));
        }
        if self.locator.locate("festival").is_some() {
            return Ok(festival_command(text));
        }
        tracing::warn!(target: "tts", "No TTS engine found on Linux (espeak or festival)");
        Err(TtsError::NoEngineFound(
            "no TTS engine found on Linux (espeak or festival)".to_string(),
        ))
    }
}

impl CommandBuilder for PlatformCommandBuilder {
    fn build(&self, text: &str, config: &SpeechConfig) -> Result<ExternalInvocation> {
        match &self.platform {
            Platform::MacOs => Ok(say_command(text, config)),
            Platform::Linux => self.linux_command(text, config),
            Platform::Windows => Ok(powershell_command(text, config)),
            Platform::Unsupported(os) => Err(TtsError::UnsupportedPlatform(os.clone())),
        }
    }
}

fn say_voice(language: &str) -> &'static str {
    match language {
        "id-ID" | "id" => "Damayanti",
        "en-US" | "en" => "Alex",
        _ => "Damayanti",
    }
}

fn espeak_voice(language: &str) -> &'static str {
    match language {
        "id-ID" | "id" => "id",
        "en-US" | "en" => "en-us",
        _ => "id",
    }
}

/// `175 * speed` words per minute, truncated, clamped to the engine range
fn words_per_minute(speed: f64, min: i64, max: i64) -> i64 {
    ((175.0 * speed) as i64).clamp(min, max)
}

fn say_command(text: &str, config: &SpeechConfig) -> ExternalInvocation {
    let voice = config
        .voice_name()
        .map(str::to_string)
        .unwrap_or_else(|| say_voice(&config.language).to_string());

    let mut args = vec![
        "-v".to_string(),
        voice,
        "-r".to_string(),
        words_per_minute(config.speed, 50, 400).to_string(),
    ];

    let volume = ((config.volume * 100.0) as i64).clamp(0, 100);
    if volume > 0 {
        args.push("-a".to_string());
        args.push(volume.to_string());
    }

    // Passed as an argv entry, no shell quoting involved
    args.push(text.to_string());
    ExternalInvocation::new("say", args)
}

fn espeak_command(text: &str, config: &SpeechConfig) -> ExternalInvocation {
    let voice = config
        .voice_name()
        .map(str::to_string)
        .unwrap_or_else(|| espeak_voice(&config.language).to_string());

    // espeak accepts 0-200 amplitude itself
    let amplitude = (config.volume * 100.0) as i64;

    ExternalInvocation::new(
        "espeak",
        vec![
            "-v".to_string(),
            voice,
            "-s".to_string(),
            words_per_minute(config.speed, 80, 450).to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "-p".to_string(),
            "50".to_string(),
            text.to_string(),
        ],
    )
}

/// Festival has no argv text input, so the text is piped in through a shell.
///
/// KNOWN DEFECT: the text is interpolated into a single-quoted shell string.
/// The sanitizer only rewrites double quotes, so a single quote in the text
/// ends the `echo` quoting and the rest is parsed by `sh`. Anything reaching
/// this path must be treated as shell input.
fn festival_command(text: &str) -> ExternalInvocation {
    let script = format!("(SayText \"{}\")", text);
    ExternalInvocation::new(
        "sh",
        vec![
            "-c".to_string(),
            format!("echo '{}' | festival --tts", script),
        ],
    )
}

/// Escape for a double-quoted PowerShell string (backtick is the escape char)
pub(crate) fn escape_powershell(s: &str) -> String {
    s.replace('`', "``").replace('"', "`\"").replace('$', "`$")
}

fn powershell_command(text: &str, config: &SpeechConfig) -> ExternalInvocation {
    let rate = ((config.speed - 1.0) * 10.0).round().clamp(-10.0, 10.0) as i64;
    let volume = (config.volume * 100.0).round().clamp(0.0, 100.0) as i64;

    let select_voice = match config.voice_name() {
        Some(name) => format!(
            "try {{ $speak.SelectVoice(\"{}\") }} catch {{ }}\n",
            escape_powershell(name)
        ),
        None => String::new(),
    };

    let script = format!(
        r#"
Add-Type -AssemblyName System.speech
$speak = New-Object System.Speech.Synthesis.SpeechSynthesizer

try {{
    $culture = New-Object System.Globalization.CultureInfo("{culture}")
    $speak.SelectVoiceByHints([System.Speech.Synthesis.VoiceGender]::Female,
                              [System.Speech.Synthesis.VoiceAge]::Adult,
                              0, $culture)
}} catch {{
    # keep the default voice
}}
{select_voice}
$speak.Rate = {rate}
$speak.Volume = {volume}
$speak.Speak("{text}")
"#,
        culture = escape_powershell(&config.language),
        select_voice = select_voice,
        rate = rate,
        volume = volume,
        text = escape_powershell(text),
    );

    ExternalInvocation::new("powershell", vec!["-Command".to_string(), script])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FixedLocator(HashSet<&'static str>);

    impl FixedLocator {
        fn with(bins: &[&'static str]) -> Box<Self> {
            Box::new(Self(bins.iter().copied().collect()))
        }
    }

    impl EngineLocator for FixedLocator {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.0
                .contains(program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        }
    }

    fn cfg(language: &str, speed: f64, volume: f64) -> SpeechConfig {
        SpeechConfig {
            language: language.into(),
            speed,
            volume,
            voice: None,
            use_system_tts: true,
        }
    }

    fn builder(platform: Platform, bins: &[&'static str]) -> PlatformCommandBuilder {
        PlatformCommandBuilder::new(platform, FixedLocator::with(bins))
    }

    fn arg_after<'a>(inv: &'a ExternalInvocation, flag: &str) -> Option<&'a str> {
        inv.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| inv.args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_say_hello_world() {
        let inv = builder(Platform::MacOs, &[])
            .build("Hello world", &cfg("en-US", 1.0, 1.0))
            .unwrap();
        assert_eq!(inv.program, "say");
        assert_eq!(
            inv.args,
            vec!["-v", "Alex", "-r", "175", "-a", "100", "Hello world"]
        );
        assert_eq!(
            inv.to_string(),
            r#"say -v Alex -r 175 -a 100 "Hello world""#
        );
    }

    #[test]
    fn test_say_voice_table() {
        let b = builder(Platform::MacOs, &[]);
        for (lang, voice) in [
            ("id-ID", "Damayanti"),
            ("id", "Damayanti"),
            ("en", "Alex"),
            ("fr-FR", "Damayanti"),
        ] {
            let inv = b.build("x", &cfg(lang, 1.0, 1.0)).unwrap();
            assert_eq!(arg_after(&inv, "-v"), Some(voice), "language {lang}");
        }
    }

    #[test]
    fn test_say_rate_and_volume_clamps() {
        let b = builder(Platform::MacOs, &[]);
        let slow = b.build("x", &cfg("en", 0.1, 1.0)).unwrap();
        assert_eq!(arg_after(&slow, "-r"), Some("50"));
        let fast = b.build("x", &cfg("en", 5.0, 1.0)).unwrap();
        assert_eq!(arg_after(&fast, "-r"), Some("400"));
        let loud = b.build("x", &cfg("en", 1.0, 4.0)).unwrap();
        assert_eq!(arg_after(&loud, "-a"), Some("100"));
        let silent = b.build("x", &cfg("en", 1.0, -1.0)).unwrap();
        assert_eq!(arg_after(&silent, "-a"), None);
    }

    #[test]
    fn test_explicit_voice_overrides_table() {
        let mut c = cfg("en-US", 1.0, 1.0);
        c.voice = Some("Samantha".into());
        let inv = builder(Platform::MacOs, &[]).build("x", &c).unwrap();
        assert_eq!(arg_after(&inv, "-v"), Some("Samantha"));
    }

    #[test]
    fn test_espeak_mapping() {
        let inv = builder(Platform::Linux, &["espeak", "festival"])
            .build("halo", &cfg("en-US", 1.5, 1.5))
            .unwrap();
        assert_eq!(inv.program, "espeak");
        assert_eq!(
            inv.args,
            vec!["-v", "en-us", "-s", "262", "-a", "150", "-p", "50", "halo"]
        );
    }

    #[test]
    fn test_espeak_speed_clamps() {
        let b = builder(Platform::Linux, &["espeak"]);
        let slow = b.build("x", &cfg("id", 0.2, 1.0)).unwrap();
        assert_eq!(arg_after(&slow, "-s"), Some("80"));
        assert_eq!(arg_after(&slow, "-v"), Some("id"));
        let fast = b.build("x", &cfg("xx", 3.0, 1.0)).unwrap();
        assert_eq!(arg_after(&fast, "-s"), Some("450"));
        assert_eq!(arg_after(&fast, "-v"), Some("id"));
    }

    #[test]
    fn test_festival_fallback() {
        let inv = builder(Platform::Linux, &["festival"])
            .build("selamat pagi", &cfg("id-ID", 1.0, 1.0))
            .unwrap();
        assert_eq!(inv.program, "sh");
        assert_eq!(
            inv.args,
            vec![
                "-c".to_string(),
                r#"echo '(SayText "selamat pagi")' | festival --tts"#.to_string()
            ]
        );
    }

    #[test]
    fn test_linux_without_engine() {
        let err = builder(Platform::Linux, &[])
            .build("x", &cfg("id", 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err.code(), "NO_ENGINE_FOUND");
    }

    #[test]
    fn test_unsupported_platform() {
        let err = builder(Platform::from_os("freebsd"), &["espeak"])
            .build("x", &cfg("id", 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_PLATFORM");
        assert!(err.to_string().contains("freebsd"));
    }

    #[test]
    fn test_powershell_script() {
        let inv = builder(Platform::Windows, &[])
            .build("Harga $5 `ok`", &cfg("id-ID", 1.5, 0.8))
            .unwrap();
        assert_eq!(inv.program, "powershell");
        assert_eq!(inv.args[0], "-Command");
        let script = &inv.args[1];
        assert!(script.contains("CultureInfo(\"id-ID\")"));
        assert!(script.contains("$speak.Rate = 5\n"));
        assert!(script.contains("$speak.Volume = 80\n"));
        assert!(script.contains("$speak.Speak(\"Harga `$5 ``ok``\")"));
    }

    #[test]
    fn test_powershell_clamps() {
        let b = builder(Platform::Windows, &[]);
        let script = &b.build("x", &cfg("en-US", 3.5, 2.0)).unwrap().args[1];
        assert!(script.contains("$speak.Rate = 10\n"));
        assert!(script.contains("$speak.Volume = 100\n"));
        let script = &b.build("x", &cfg("en-US", -1.0, -0.5)).unwrap().args[1];
        assert!(script.contains("$speak.Rate = -10\n"));
        assert!(script.contains("$speak.Volume = 0\n"));
    }

    #[test]
    fn test_escape_powershell() {
        assert_eq!(escape_powershell(r#"a"b"#), "a`\"b");
        assert_eq!(escape_powershell("`$x"), "```$x");
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("haiku").as_str(), "haiku");
    }
}
