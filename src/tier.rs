//! Subscription tier catalog and the cascading-access rule.
//!
//! Tiers are totally ordered: `free < tier5 < tier10 < tier15`. A model
//! assigned a minimum tier is usable by that tier and every tier above it.
//! All ordering is derived from [`TIER_ORDER`]; adding a tier only requires
//! extending that list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four subscription tiers, lowest to highest.
pub const TIER_ORDER: [TierName; 4] = [
    TierName::Free,
    TierName::Tier5,
    TierName::Tier10,
    TierName::Tier15,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    Free,
    Tier5,
    Tier10,
    Tier15,
}

impl TierName {
    /// Position in [`TIER_ORDER`]. Never hard-coded per variant so the
    /// ordering has a single source of truth.
    pub fn order(self) -> usize {
        TIER_ORDER
            .iter()
            .position(|t| *t == self)
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TierName::Free => "free",
            TierName::Tier5 => "tier5",
            TierName::Tier10 => "tier10",
            TierName::Tier15 => "tier15",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TierName::Free => "Free",
            TierName::Tier5 => "Basic",
            TierName::Tier10 => "Plus",
            TierName::Tier15 => "Pro",
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(TierName::Free),
            "tier5" => Ok(TierName::Tier5),
            "tier10" => Ok(TierName::Tier10),
            "tier15" => Ok(TierName::Tier15),
            _ => Err(()),
        }
    }
}

/// Cascading-access rule: a model with minimum tier `min_tier` is usable by
/// `user_tier` iff the user's tier is at or above it.
pub fn is_available(user_tier: TierName, min_tier: TierName) -> bool {
    user_tier.order() >= min_tier.order()
}

// --- Per-tier configuration ---

/// Feature toggles carried by every tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TierFeatures {
    pub has_rag: bool,
    pub has_projects: bool,
    pub has_pro_replies: bool,
    pub has_vision: bool,
}

/// Deep-research entitlement. `limit` is monthly, 0 = unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeepResearchConfig {
    pub enabled: bool,
    pub limit: u64,
    pub max_sources: u32,
}

/// Designs entitlement. `limit` is monthly, 0 = unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DesignsConfig {
    pub enabled: bool,
    pub limit: u64,
    pub supports_image_export: bool,
}

/// Presentations entitlement. `limit` is monthly, 0 = unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresentationsConfig {
    pub enabled: bool,
    pub limit: u64,
    pub max_slides: u32,
}

pub const DEEP_RESEARCH_DEFAULT_LIMIT: u64 = 0;
pub const DEEP_RESEARCH_DEFAULT_MAX_SOURCES: u32 = 20;
pub const DESIGNS_DEFAULT_LIMIT: u64 = 0;
pub const PRESENTATIONS_DEFAULT_LIMIT: u64 = 0;
pub const PRESENTATIONS_DEFAULT_MAX_SLIDES: u32 = 20;

/// Full per-tier configuration record. Updates replace the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    pub tier_name: TierName,
    pub display_name: String,
    pub price_usd: f64,
    pub price_developing: f64,
    /// Ignored when `is_unlimited_tokens` is set.
    pub token_limit: u64,
    pub is_unlimited_tokens: bool,
    pub max_projects: u32,
    pub rag_storage_limit_bytes: u64,
    pub max_file_size_mb: u32,
    pub memory_capacity_mb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_vision_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pro_search_model_id: Option<String>,
    #[serde(default)]
    pub features: TierFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_research: Option<DeepResearchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designs: Option<DesignsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentations: Option<PresentationsConfig>,
}

impl TierConfig {
    /// Defaults used to synthesize a tier record that was never written.
    /// Exactly one record per tier name always exists from the API's point
    /// of view; these are the values backing the missing rows.
    pub fn defaults_for(tier: TierName) -> Self {
        let base = Self {
            tier_name: tier,
            display_name: tier.display_name().to_string(),
            price_usd: 0.0,
            price_developing: 0.0,
            token_limit: 50_000,
            is_unlimited_tokens: false,
            max_projects: 1,
            rag_storage_limit_bytes: 100 * 1024 * 1024,
            max_file_size_mb: 5,
            memory_capacity_mb: 1,
            default_model: None,
            default_vision_model: None,
            default_pro_search_model_id: None,
            features: TierFeatures::default(),
            deep_research: None,
            designs: None,
            presentations: None,
        };

        match tier {
            TierName::Free => base,
            TierName::Tier5 => Self {
                price_usd: 5.0,
                price_developing: 3.0,
                token_limit: 500_000,
                max_projects: 5,
                rag_storage_limit_bytes: 1024 * 1024 * 1024,
                max_file_size_mb: 10,
                memory_capacity_mb: 5,
                features: TierFeatures {
                    has_rag: true,
                    has_projects: true,
                    ..TierFeatures::default()
                },
                ..base
            },
            TierName::Tier10 => Self {
                price_usd: 10.0,
                price_developing: 6.0,
                token_limit: 2_000_000,
                max_projects: 20,
                rag_storage_limit_bytes: 5 * 1024 * 1024 * 1024,
                max_file_size_mb: 25,
                memory_capacity_mb: 10,
                features: TierFeatures {
                    has_rag: true,
                    has_projects: true,
                    has_pro_replies: true,
                    has_vision: true,
                },
                ..base
            },
            TierName::Tier15 => Self {
                price_usd: 15.0,
                price_developing: 9.0,
                token_limit: 0,
                is_unlimited_tokens: true,
                max_projects: 50,
                rag_storage_limit_bytes: 10 * 1024 * 1024 * 1024,
                max_file_size_mb: 50,
                memory_capacity_mb: 20,
                features: TierFeatures {
                    has_rag: true,
                    has_projects: true,
                    has_pro_replies: true,
                    has_vision: true,
                },
                deep_research: Some(DeepResearchConfig {
                    enabled: true,
                    limit: DEEP_RESEARCH_DEFAULT_LIMIT,
                    max_sources: DEEP_RESEARCH_DEFAULT_MAX_SOURCES,
                }),
                designs: Some(DesignsConfig {
                    enabled: true,
                    limit: DESIGNS_DEFAULT_LIMIT,
                    supports_image_export: true,
                }),
                presentations: Some(PresentationsConfig {
                    enabled: true,
                    limit: PRESENTATIONS_DEFAULT_LIMIT,
                    max_slides: PRESENTATIONS_DEFAULT_MAX_SLIDES,
                }),
                ..base
            },
        }
    }
}

// --- Entitlement updates ---

/// Incoming entitlement state in a tier update. Nested values the operator
/// left untouched arrive as `None` and resolve against the stored config,
/// falling back to the documented defaults on first enable. This guarantees
/// a partially-initialized nested object is never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DeepResearchUpdate {
    pub enabled: bool,
    pub limit: Option<u64>,
    pub max_sources: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignsUpdate {
    pub enabled: bool,
    pub limit: Option<u64>,
    pub supports_image_export: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationsUpdate {
    pub enabled: bool,
    pub limit: Option<u64>,
    pub max_slides: Option<u32>,
}

pub fn resolve_deep_research(
    incoming: Option<&DeepResearchUpdate>,
    previous: Option<&DeepResearchConfig>,
) -> Option<DeepResearchConfig> {
    let update = match incoming {
        Some(u) => u,
        // Not mentioned in the update: carry the stored config forward.
        None => return previous.cloned(),
    };
    Some(DeepResearchConfig {
        enabled: update.enabled,
        limit: update
            .limit
            .or(previous.map(|p| p.limit))
            .unwrap_or(DEEP_RESEARCH_DEFAULT_LIMIT),
        max_sources: update
            .max_sources
            .or(previous.map(|p| p.max_sources))
            .unwrap_or(DEEP_RESEARCH_DEFAULT_MAX_SOURCES),
    })
}

pub fn resolve_designs(
    incoming: Option<&DesignsUpdate>,
    previous: Option<&DesignsConfig>,
) -> Option<DesignsConfig> {
    let update = match incoming {
        Some(u) => u,
        None => return previous.cloned(),
    };
    Some(DesignsConfig {
        enabled: update.enabled,
        limit: update
            .limit
            .or(previous.map(|p| p.limit))
            .unwrap_or(DESIGNS_DEFAULT_LIMIT),
        supports_image_export: update
            .supports_image_export
            .or(previous.map(|p| p.supports_image_export))
            .unwrap_or(true),
    })
}

pub fn resolve_presentations(
    incoming: Option<&PresentationsUpdate>,
    previous: Option<&PresentationsConfig>,
) -> Option<PresentationsConfig> {
    let update = match incoming {
        Some(u) => u,
        None => return previous.cloned(),
    };
    Some(PresentationsConfig {
        enabled: update.enabled,
        limit: update
            .limit
            .or(previous.map(|p| p.limit))
            .unwrap_or(PRESENTATIONS_DEFAULT_LIMIT),
        max_slides: update
            .max_slides
            .or(previous.map(|p| p.max_slides))
            .unwrap_or(PRESENTATIONS_DEFAULT_MAX_SLIDES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascading_access_matches_order() {
        for user in TIER_ORDER {
            for min in TIER_ORDER {
                assert_eq!(
                    is_available(user, min),
                    user.order() >= min.order(),
                    "user={user} min={min}"
                );
            }
        }
    }

    #[test]
    fn test_cascading_access_examples() {
        assert!(is_available(TierName::Tier10, TierName::Tier5));
        assert!(is_available(TierName::Tier5, TierName::Tier5));
        assert!(is_available(TierName::Tier15, TierName::Free));
        assert!(!is_available(TierName::Free, TierName::Tier5));
        assert!(!is_available(TierName::Tier10, TierName::Tier15));
    }

    #[test]
    fn test_tier_name_round_trip() {
        for tier in TIER_ORDER {
            assert_eq!(tier.as_str().parse::<TierName>(), Ok(tier));
        }
        assert!("tier20".parse::<TierName>().is_err());
        assert!("".parse::<TierName>().is_err());
    }

    #[test]
    fn test_tier_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&TierName::Tier10).unwrap();
        assert_eq!(json, "\"tier10\"");
        let parsed: TierName = serde_json::from_str("\"free\"").unwrap();
        assert_eq!(parsed, TierName::Free);
    }

    #[test]
    fn test_defaults_exist_for_every_tier() {
        for tier in TIER_ORDER {
            let config = TierConfig::defaults_for(tier);
            assert_eq!(config.tier_name, tier);
            assert!(!config.display_name.is_empty());
        }
        assert!(TierConfig::defaults_for(TierName::Tier15).is_unlimited_tokens);
        assert!(!TierConfig::defaults_for(TierName::Free).features.has_rag);
    }

    #[test]
    fn test_first_enable_seeds_deep_research_defaults() {
        let update = DeepResearchUpdate {
            enabled: true,
            limit: None,
            max_sources: None,
        };
        let resolved = resolve_deep_research(Some(&update), None).unwrap();
        assert!(resolved.enabled);
        assert_eq!(resolved.limit, 0);
        assert_eq!(resolved.max_sources, 20);
    }

    #[test]
    fn test_retoggle_preserves_operator_values() {
        // Operator enables and customizes.
        let customized = resolve_deep_research(
            Some(&DeepResearchUpdate {
                enabled: true,
                limit: Some(5),
                max_sources: Some(40),
            }),
            None,
        )
        .unwrap();
        assert_eq!(customized.limit, 5);

        // Toggle off: values survive with enabled = false.
        let off = resolve_deep_research(Some(&DeepResearchUpdate::default()), Some(&customized))
            .unwrap();
        assert!(!off.enabled);
        assert_eq!(off.limit, 5);
        assert_eq!(off.max_sources, 40);

        // Toggle back on without re-supplying values: no re-seeding.
        let on = resolve_deep_research(
            Some(&DeepResearchUpdate {
                enabled: true,
                limit: None,
                max_sources: None,
            }),
            Some(&off),
        )
        .unwrap();
        assert!(on.enabled);
        assert_eq!(on.limit, 5);
        assert_eq!(on.max_sources, 40);
    }

    #[test]
    fn test_absent_update_carries_stored_config_forward() {
        let stored = PresentationsConfig {
            enabled: true,
            limit: 12,
            max_slides: 30,
        };
        assert_eq!(
            resolve_presentations(None, Some(&stored)),
            Some(stored.clone())
        );
        assert_eq!(resolve_presentations(None, None), None);
    }

    #[test]
    fn test_designs_seed_defaults() {
        let resolved = resolve_designs(
            Some(&DesignsUpdate {
                enabled: true,
                limit: None,
                supports_image_export: None,
            }),
            None,
        )
        .unwrap();
        assert_eq!(resolved.limit, 0);
        assert!(resolved.supports_image_export);
    }
}
