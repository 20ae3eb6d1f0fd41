use super::command::Platform;
use crate::{Result, TtsError};
use tokio::process::Command;
use tracing::{debug, warn};

const WINDOWS_VOICES_SCRIPT: &str = r#"
Add-Type -AssemblyName System.speech
$speak = New-Object System.Speech.Synthesis.SpeechSynthesizer
$speak.GetInstalledVoices() | ForEach-Object {
    $_.VoiceInfo.Name
}
"#;

/// Installed voices as reported by the platform tool, in the tool's order.
pub async fn list_voices(platform: &Platform) -> Result<Vec<String>> {
    let voices = match platform {
        Platform::MacOs => parse_say_voices(&run_tool("say", &["-v", "?"]).await?),
        Platform::Windows => {
            parse_windows_voices(&run_tool("powershell", &["-Command", WINDOWS_VOICES_SCRIPT]).await?)
        }
        Platform::Linux => parse_espeak_voices(&run_tool("espeak", &["--voices"]).await?),
        Platform::Unsupported(_) => vec!["default".to_string()],
    };
    debug!(target: "voices", platform = %platform, count = voices.len(), "Listed voices");
    Ok(voices)
}

async fn run_tool(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            warn!(target: "voices", program, error = %e, "Failed to run voice listing tool");
            TtsError::Engine(format!("{}: {}", program, e))
        })?;

    if !output.status.success() {
        return Err(TtsError::Engine(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `say -v ?`: skip lines carrying the `#` comment marker, keep the first token.
pub fn parse_say_voices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.contains('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// One voice name per line.
pub fn parse_windows_voices(output: &str) -> Vec<String> {
    output
        .trim()
        .lines()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `espeak --voices`: header first, language code is the second column.
pub fn parse_espeak_voices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_say_voices() {
        let output = "Alex                en_US    # Most people recognize me by my voice.\n\
                      Damayanti\n\
                      \n\
                      Samantha   en_US\n";
        assert_eq!(parse_say_voices(output), vec!["Damayanti", "Samantha"]);
    }

    #[test]
    fn test_parse_windows_voices() {
        let output = "Microsoft David Desktop\r\nMicrosoft Zira Desktop\r\n\r\n";
        assert_eq!(
            parse_windows_voices(output),
            vec!["Microsoft David Desktop", "Microsoft Zira Desktop"]
        );
    }

    #[test]
    fn test_parse_espeak_voices_keeps_order_and_duplicates() {
        let output = "Pty Language Age/Gender VoiceName          File          Other Languages\n \
                      5  id             M  indonesian           sit/id\n \
                      5  en-us          M  english-us           en/en-us     (en 8)\n \
                      5  id             M  indonesian-alt       sit/id2\n\
                      \n";
        assert_eq!(parse_espeak_voices(output), vec!["id", "en-us", "id"]);
    }

    #[tokio::test]
    async fn test_unsupported_platform_lists_default() {
        let voices = list_voices(&Platform::from_os("plan9")).await.unwrap();
        assert_eq!(voices, vec!["default"]);
    }
}
