use serde::{Deserialize, Serialize};

/// The set of external ("rovered") chains this core observes. A closed enum
/// replaces the source's dynamic `<chain>.block.latest`-style reflection
/// (spec design note: "Dynamic reflection on header map").
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainTag {
    Btc,
    Eth,
    Ltc,
    Neo,
    Wav,
}

impl ChainTag {
    pub const ALL: [ChainTag; 5] = [
        ChainTag::Btc,
        ChainTag::Eth,
        ChainTag::Ltc,
        ChainTag::Neo,
        ChainTag::Wav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainTag::Btc => "btc",
            ChainTag::Eth => "eth",
            ChainTag::Ltc => "ltc",
            ChainTag::Neo => "neo",
            ChainTag::Wav => "wav",
        }
    }
}

impl std::fmt::Display for ChainTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChainTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "btc" => Ok(ChainTag::Btc),
            "eth" => Ok(ChainTag::Eth),
            "ltc" => Ok(ChainTag::Ltc),
            "neo" => Ok(ChainTag::Neo),
            "wav" => Ok(ChainTag::Wav),
            other => Err(anyhow::anyhow!("unknown rover chain tag: {}", other)),
        }
    }
}
