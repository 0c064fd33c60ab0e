//! Tailoring model identifiers accepted by the remote service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Model used for a tailoring request. Serialized as the service's wire name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "DEEPSEEK_R1_0528")]
    DeepseekR1_0528,
    #[serde(rename = "DEEPSEEK_V3_0324")]
    DeepseekV3_0324,
    #[serde(rename = "DEEPSEEK_R1T2")]
    DeepseekR1T2,
    #[serde(rename = "QWEN3_235B_A22B")]
    Qwen3_235bA22b,
    #[serde(rename = "Z.AI_GLM_4_5_AIR")]
    ZaiGlm4_5Air,
    #[serde(rename = "MICROSOFT_MAI_DS_R1")]
    MicrosoftMaiDsR1,
    #[serde(rename = "MOONSHOTAI_KIMI_VL_A3B_THINKING")]
    MoonshotKimiVlA3bThinking,
}

impl ModelId {
    pub const ALL: [ModelId; 7] = [
        ModelId::DeepseekR1_0528,
        ModelId::DeepseekV3_0324,
        ModelId::DeepseekR1T2,
        ModelId::Qwen3_235bA22b,
        ModelId::ZaiGlm4_5Air,
        ModelId::MicrosoftMaiDsR1,
        ModelId::MoonshotKimiVlA3bThinking,
    ];

    /// Identifier sent in the `model` field of a tailoring request.
    pub fn wire_name(self) -> &'static str {
        match self {
            ModelId::DeepseekR1_0528 => "DEEPSEEK_R1_0528",
            ModelId::DeepseekV3_0324 => "DEEPSEEK_V3_0324",
            ModelId::DeepseekR1T2 => "DEEPSEEK_R1T2",
            ModelId::Qwen3_235bA22b => "QWEN3_235B_A22B",
            ModelId::ZaiGlm4_5Air => "Z.AI_GLM_4_5_AIR",
            ModelId::MicrosoftMaiDsR1 => "MICROSOFT_MAI_DS_R1",
            ModelId::MoonshotKimiVlA3bThinking => "MOONSHOTAI_KIMI_VL_A3B_THINKING",
        }
    }

    /// Human-readable name for pickers and listings.
    pub fn label(self) -> &'static str {
        match self {
            ModelId::DeepseekR1_0528 => "DeepSeek: R1 0528",
            ModelId::DeepseekV3_0324 => "DeepSeek: V3 0324",
            ModelId::DeepseekR1T2 => "DeepSeek: R1T2",
            ModelId::Qwen3_235bA22b => "Qwen3 235B A22B",
            ModelId::ZaiGlm4_5Air => "Z.AI: GLM 4.5 Air",
            ModelId::MicrosoftMaiDsR1 => "Microsoft: MAI DS R1",
            ModelId::MoonshotKimiVlA3bThinking => "Moonshot AI: Kimi VL A3B Thinking",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ModelId::ALL
            .into_iter()
            .find(|m| m.wire_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = ModelId::ALL.iter().map(|m| m.wire_name()).collect();
                format!("unknown model '{wanted}' (expected one of: {})", known.join(", "))
            })
    }
}
