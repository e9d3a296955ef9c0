use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ElementId = String;
pub type PatternId = String;

/// A record that can be loaded from a JSON source and identified by id.
pub trait Record: DeserializeOwned + Send + 'static {
    /// Directory / collection the record lives in.
    const COLLECTION: &'static str;

    fn record_id(&self) -> &str;
}

/// Top-level axis of the syndrome-element taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementCategory {
    /// 病位: where the disorder sits.
    #[serde(rename = "病位", alias = "location", alias = "bingwei")]
    Location,
    /// 病性: what the disorder is.
    #[serde(rename = "病性", alias = "nature", alias = "bingxing")]
    Nature,
}

impl ElementCategory {
    pub fn subcategories(self) -> &'static [Subcategory] {
        match self {
            ElementCategory::Location => &[
                Subcategory::FiveOrgans,
                Subcategory::SixHollowOrgans,
                Subcategory::SpecialStructures,
                Subcategory::BodyRegions,
                Subcategory::ExteriorInterior,
                Subcategory::TissueTypes,
            ],
            ElementCategory::Nature => &[
                Subcategory::QiDynamic,
                Subcategory::Blood,
                Subcategory::YinYang,
                Subcategory::ExternalPathogens,
                Subcategory::PathologicalProducts,
                Subcategory::FluidEssence,
                Subcategory::InternallyGenerated,
            ],
        }
    }
}

impl fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementCategory::Location => "病位",
            ElementCategory::Nature => "病性",
        };
        write!(f, "{}", s)
    }
}

/// Second level of the taxonomy. Each subcategory belongs to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subcategory {
    #[serde(rename = "五臟", alias = "wuzang", alias = "five_organs")]
    FiveOrgans,
    #[serde(rename = "六腑", alias = "liufu", alias = "six_hollow_organs")]
    SixHollowOrgans,
    #[serde(rename = "特殊", alias = "teshu", alias = "special")]
    SpecialStructures,
    #[serde(rename = "部位", alias = "buwei", alias = "body_regions")]
    BodyRegions,
    #[serde(rename = "表裡", alias = "biaoli", alias = "exterior_interior")]
    ExteriorInterior,
    #[serde(rename = "形體", alias = "xingti", alias = "tissue")]
    TissueTypes,
    #[serde(rename = "氣機病變", alias = "qiji", alias = "qi_dynamic")]
    QiDynamic,
    #[serde(rename = "血液病變", alias = "xueye", alias = "blood")]
    Blood,
    #[serde(rename = "陰陽病變", alias = "yinyang", alias = "yin_yang")]
    YinYang,
    #[serde(rename = "外邪", alias = "waixie", alias = "external_pathogens")]
    ExternalPathogens,
    #[serde(rename = "病理產物", alias = "bingli", alias = "pathological_products")]
    PathologicalProducts,
    #[serde(rename = "精津病變", alias = "jingjin", alias = "fluid_essence")]
    FluidEssence,
    #[serde(rename = "內生病邪", alias = "neisheng", alias = "internally_generated")]
    InternallyGenerated,
}

impl Subcategory {
    pub fn category(self) -> ElementCategory {
        match self {
            Subcategory::FiveOrgans
            | Subcategory::SixHollowOrgans
            | Subcategory::SpecialStructures
            | Subcategory::BodyRegions
            | Subcategory::ExteriorInterior
            | Subcategory::TissueTypes => ElementCategory::Location,
            _ => ElementCategory::Nature,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Subcategory::FiveOrgans => "五臟",
            Subcategory::SixHollowOrgans => "六腑",
            Subcategory::SpecialStructures => "特殊",
            Subcategory::BodyRegions => "部位",
            Subcategory::ExteriorInterior => "表裡",
            Subcategory::TissueTypes => "形體",
            Subcategory::QiDynamic => "氣機病變",
            Subcategory::Blood => "血液病變",
            Subcategory::YinYang => "陰陽病變",
            Subcategory::ExternalPathogens => "外邪",
            Subcategory::PathologicalProducts => "病理產物",
            Subcategory::FluidEssence => "精津病變",
            Subcategory::InternallyGenerated => "內生病邪",
        }
    }
}

impl fmt::Display for Subcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Subcategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
            .map_err(|_| format!("unknown subcategory: {}", s))
    }
}

/// Ids of nature elements that always make a pattern critical.
pub const CRITICAL_ELEMENT_IDS: &[&str] = &["qi_tuo", "wang_yin", "wang_yang", "qi_jue", "xue_tuo"];
