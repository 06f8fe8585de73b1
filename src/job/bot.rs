//! Standard jobs for a named bot
//!
//! Bot names are dash-separated, e.g.
//! `Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Release-All-NativeFonts`.
//! Field 3 is the machine model and field 4 says whether the bot tests the
//! CPU or GPU backend.

use super::Job;
use crate::error::ConfigError;
use crate::runner::{CaseGroup, Inventory};

/// Extra visual-case configurations run only on GCE CPU bots
const GCE_VISUAL_CONFIGS: &[&str] = &[
    "--ct g8 --legacy",
    "--ct 565 --legacy",
    "--ct 8888",
    "--ct f16",
    "--ct f16 --tf linear",
    "--ct 8888 --gamut p3",
    "--ct 8888 --gamut narrow --tf 2.2",
    "--ct f16 --gamut rec2020 --tf rec2020",
    "--skvm",
    "--skvm --ct f16",
];

/// The parts of a bot name that select jobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotName {
    name: String,
    model: String,
    cpu_or_gpu: String,
}

impl BotName {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = name.split('-').collect();
        if parts.len() < 5 {
            return Err(ConfigError::InvalidBotName {
                name: name.to_string(),
                reason: format!("expected at least 5 dash-separated fields, got {}", parts.len()),
            });
        }

        Ok(Self {
            name: name.to_string(),
            model: parts[3].to_string(),
            cpu_or_gpu: parts[4].to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_cpu(&self) -> bool {
        self.cpu_or_gpu == "CPU"
    }

    pub fn native_fonts(&self) -> bool {
        self.name.contains("NativeFonts")
    }
}

/// Jobs a bot runs on top of any command-line or script jobs
pub fn bot_jobs(bot: &BotName, inventory: &Inventory) -> Vec<Job> {
    if !bot.is_cpu() {
        return Vec::new();
    }

    let common = [
        "--nativeFonts".to_string(),
        bot.native_fonts().to_string(),
        "-b".to_string(),
        "cpu".to_string(),
    ];

    let job = |group: CaseGroup, extra: &str| {
        let mut flags: Vec<String> = extra.split_whitespace().map(str::to_string).collect();
        flags.extend(common.iter().cloned());
        Job::new(inventory.members(group).to_vec(), flags)
    };

    let mut jobs = vec![
        job(CaseGroup::UnitTests, ""),
        job(CaseGroup::VisualCases, "--ct 8888 --legacy"),
    ];

    if bot.model() == "GCE" {
        jobs.extend(
            GCE_VISUAL_CONFIGS
                .iter()
                .map(|extra| job(CaseGroup::VisualCases, *extra)),
        );
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> Inventory {
        Inventory::new(vec!["gm1".into(), "gm2".into()], vec!["t1".into()])
    }

    #[test]
    fn test_parse_bot_name() {
        let bot = BotName::parse("Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Debug-All").unwrap();
        assert_eq!(bot.model(), "GCE");
        assert!(bot.is_cpu());
        assert!(!bot.native_fonts());
    }

    #[test]
    fn test_short_bot_name_rejected() {
        let err = BotName::parse("Test-Debian10-Clang").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBotName { .. }));
    }

    #[test]
    fn test_cpu_non_gce_jobs() {
        let bot = BotName::parse("Test-Mac10.15-Clang-MacBookPro11.5-CPU-AVX2-x86_64-Release-All-NativeFonts")
            .unwrap();
        let jobs = bot_jobs(&bot, &inventory());

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].sources, ["t1"]);
        assert_eq!(jobs[0].flags, ["--nativeFonts", "true", "-b", "cpu"]);
        assert_eq!(jobs[1].sources, ["gm1", "gm2"]);
        assert_eq!(
            jobs[1].flags,
            ["--ct", "8888", "--legacy", "--nativeFonts", "true", "-b", "cpu"]
        );
    }

    #[test]
    fn test_gce_jobs() {
        let bot = BotName::parse("Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Debug-All").unwrap();
        let jobs = bot_jobs(&bot, &inventory());

        assert_eq!(jobs.len(), 2 + GCE_VISUAL_CONFIGS.len());
        let last = jobs.last().unwrap();
        assert_eq!(
            last.flags,
            ["--skvm", "--ct", "f16", "--nativeFonts", "false", "-b", "cpu"]
        );
    }

    #[test]
    fn test_gpu_bot_has_no_jobs() {
        let bot = BotName::parse("Test-Debian10-Clang-NUC8i5BEK-GPU-IntelIrisPlus-x86_64-Debug-All")
            .unwrap();
        assert!(bot_jobs(&bot, &inventory()).is_empty());
    }
}
