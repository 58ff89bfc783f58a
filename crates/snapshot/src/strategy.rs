use derive_more::Display;
use std::str::FromStr;

/// How a consistent copy of a live database is taken.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Strategy {
    /// `VACUUM INTO <target>`: a compacted, transactional export.
    #[display("vacuum-into")]
    VacuumInto,
    /// SQLite's online-backup API, copying pages while retrying on busy locks.
    #[display("online-backup")]
    OnlineBackup,
}

impl FromStr for Strategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "vacuum-into" | "vacuum" => Ok(Self::VacuumInto),
            "online-backup" | "backup" => Ok(Self::OnlineBackup),
            other => Err(format!("unknown snapshot strategy: {other}")),
        }
    }
}
