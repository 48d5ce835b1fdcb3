use serde::{Deserialize, Serialize};
use std::path::Path;

/// Player identity passed to the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub player_name: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            access_token: "0".repeat(32),
            xuid: "0".to_string(),
            user_type: "msa".to_string(),
        }
    }
}

/// Requested window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 854,
            height: 480,
        }
    }
}

/// Final interpreter invocation, produced once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub jvm_args: Vec<String>,
    pub main_class: String,
    pub game_args: Vec<String>,
}

impl LaunchPlan {
    /// `[executable, ...jvm_args, main_class, ...game_args]`
    pub fn command_line(&self, executable: &Path) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.jvm_args.len() + self.game_args.len() + 2);
        argv.push(executable.to_string_lossy().into_owned());
        argv.extend(self.jvm_args.iter().cloned());
        argv.push(self.main_class.clone());
        argv.extend(self.game_args.iter().cloned());
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_order() {
        let plan = LaunchPlan {
            jvm_args: vec!["-Xmx2G".into(), "-cp".into(), "a.jar".into()],
            main_class: "net.minecraft.client.main.Main".into(),
            game_args: vec!["--version".into(), "1.21".into()],
        };
        assert_eq!(
            plan.command_line(Path::new("/opt/java/bin/java")),
            [
                "/opt/java/bin/java",
                "-Xmx2G",
                "-cp",
                "a.jar",
                "net.minecraft.client.main.Main",
                "--version",
                "1.21"
            ]
        );
    }

    #[test]
    fn offline_account_defaults() {
        let account = Account::default();
        assert_eq!(account.access_token.len(), 32);
        assert_eq!(account.user_type, "msa");
    }
}
