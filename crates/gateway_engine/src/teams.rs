//! Team directory: the read-only scoreboard view the name-tag translation
//! consults.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Chat colour of a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
    #[default]
    Reset,
}

impl TeamColor {
    /// Section-sign formatting code understood by the target client.
    #[must_use]
    pub fn code(self) -> String {
        let ch = match self {
            Self::Black => '0',
            Self::DarkBlue => '1',
            Self::DarkGreen => '2',
            Self::DarkAqua => '3',
            Self::DarkRed => '4',
            Self::DarkPurple => '5',
            Self::Gold => '6',
            Self::Gray => '7',
            Self::DarkGray => '8',
            Self::Blue => '9',
            Self::Green => 'a',
            Self::Aqua => 'b',
            Self::Red => 'c',
            Self::LightPurple => 'd',
            Self::Yellow => 'e',
            Self::White => 'f',
            Self::Reset => 'r',
        };
        format!("\u{a7}{ch}")
    }
}

/// A scoreboard team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub color: TeamColor,
    /// Display names of the team's members.
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl Team {
    /// The name tag shown for `name` as a member of this team.
    #[must_use]
    pub fn decorate(&self, name: &str) -> String {
        format!("{}{}{}{}", self.prefix, self.color.code(), name, self.suffix)
    }
}

/// Read-only team lookup, queried on every display-name change.
pub trait TeamDirectory: Send + Sync {
    /// The team `display_name` belongs to, if any.
    fn team_for(&self, display_name: &str) -> Option<Team>;
}

/// A fixed set of teams, e.g. loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticTeamDirectory {
    teams: Vec<Team>,
}

impl StaticTeamDirectory {
    #[must_use]
    pub fn new(teams: Vec<Team>) -> Self {
        Self { teams }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

impl TeamDirectory for StaticTeamDirectory {
    fn team_for(&self, display_name: &str) -> Option<Team> {
        self.teams
            .iter()
            .find(|team| team.members.contains(display_name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_team() -> Team {
        Team {
            name: "red".into(),
            prefix: "[R] ".into(),
            suffix: " *".into(),
            color: TeamColor::Red,
            members: ["Alice".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_color_codes() {
        assert_eq!(TeamColor::Red.code(), "\u{a7}c");
        assert_eq!(TeamColor::Black.code(), "\u{a7}0");
        assert_eq!(TeamColor::Reset.code(), "\u{a7}r");
    }

    #[test]
    fn test_decorate() {
        assert_eq!(red_team().decorate("Alice"), "[R] \u{a7}cAlice *");
    }

    #[test]
    fn test_directory_lookup() {
        let directory = StaticTeamDirectory::new(vec![red_team()]);
        assert_eq!(directory.team_for("Alice").map(|t| t.name), Some("red".into()));
        assert!(directory.team_for("Bob").is_none());
    }

    #[test]
    fn test_directory_from_json() {
        let json = r#"[{"name":"blue","color":"blue","members":["Bob"]}]"#;
        let directory: StaticTeamDirectory = serde_json::from_str(json).unwrap();
        assert_eq!(directory.len(), 1);
        let team = directory.team_for("Bob").unwrap();
        assert_eq!(team.decorate("Bob"), "\u{a7}9Bob");
    }
}
