use clap::Parser;
use parla_models::{DEFAULT_CLIENT_SYSTEM_PROMPT, DEFAULT_MODEL, GenerationSettings};

#[derive(Parser, Debug)]
#[command(name = "parla")]
#[command(version, about = "Parla - chat with Gemini from the terminal")]
pub struct Cli {
    /// Base URL of the parla server
    #[arg(long, env = "PARLA_SERVER_URL", default_value = "http://localhost:3000")]
    pub server: String,

    /// Model to chat with
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Maximum output tokens (1000 - 20000)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// System prompt sent with every request
    #[arg(short, long, default_value = DEFAULT_CLIENT_SYSTEM_PROMPT)]
    pub system: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings from the flags; out-of-range values are clamped
    pub fn settings(&self) -> anyhow::Result<GenerationSettings> {
        let mut settings = GenerationSettings::default();
        if !settings.set_model(&self.model) {
            anyhow::bail!("Unsupported model '{}'", self.model);
        }
        if let Some(temperature) = self.temperature {
            settings.set_temperature(temperature);
        }
        if let Some(tokens) = self.max_tokens {
            settings.set_max_output_tokens(tokens);
        }
        settings.system_prompt = self.system.clone();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["parla"]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings, GenerationSettings::default());
        assert_eq!(cli.server, "http://localhost:3000");
    }

    #[test]
    fn test_flags_are_clamped() {
        let cli = Cli::parse_from([
            "parla",
            "--model",
            "gemini-2.5-pro",
            "--temperature",
            "3",
            "--max-tokens",
            "50",
        ]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.model(), "gemini-2.5-pro");
        assert!((settings.temperature() - 1.0).abs() < 1e-6);
        assert_eq!(settings.max_output_tokens(), 1_000);
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let cli = Cli::parse_from(["parla", "--model", "gpt-4o"]);
        assert!(cli.settings().is_err());
    }
}
