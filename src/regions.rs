//! Region hierarchy lookup and selection.
//!
//! The product filters content by a three-level administrative hierarchy:
//! province/city → district → neighborhood. One province (경기) is special:
//! its second level is a list of cities, and some of those cities carry an
//! extra district-within-city sub-level (수원시 → 장안구) that other
//! provinces lack.
//!
//! [`RegionTable`] is the immutable lookup side: built in at startup,
//! replaced wholesale by a server copy once per session, never mutated.
//! [`RegionSelection`] is the mutable selection side: setters cascade, so a
//! stale lower-level choice can never outlive a higher-level change.
//!
//! Every lookup degrades to an empty sequence on unknown input. The UI is
//! expected not to offer options from an empty list; nothing here signals an
//! error.

use serde::{Deserialize, Serialize};

/// Sentinel meaning "no region filter". Always listed first.
pub const REGION_ALL: &str = "전체";

struct BuiltinDistrict {
    name: &'static str,
    sub_districts: &'static [&'static str],
    neighborhoods: &'static [&'static str],
}

struct BuiltinRegion {
    name: &'static str,
    city_level: bool,
    districts: &'static [BuiltinDistrict],
}

macro_rules! district {
    ($name:literal) => {
        BuiltinDistrict {
            name: $name,
            sub_districts: &[],
            neighborhoods: &[],
        }
    };
    ($name:literal, subs: $subs:expr) => {
        BuiltinDistrict {
            name: $name,
            sub_districts: $subs,
            neighborhoods: &[],
        }
    };
    ($name:literal, dongs: $dongs:expr) => {
        BuiltinDistrict {
            name: $name,
            sub_districts: &[],
            neighborhoods: $dongs,
        }
    };
}

const BUILTIN_REGIONS: &[BuiltinRegion] = &[
    BuiltinRegion {
        name: "서울",
        city_level: false,
        districts: &[
            district!("강남구", dongs: &["역삼동", "논현동", "삼성동", "청담동", "압구정동"]),
            district!("서초구", dongs: &["서초동", "방배동", "잠원동"]),
            district!("송파구", dongs: &["잠실동", "방이동", "문정동"]),
            district!("마포구", dongs: &["서교동", "합정동", "연남동", "망원동", "상수동"]),
            district!("용산구", dongs: &["이태원동", "한남동", "후암동"]),
            district!("종로구", dongs: &["삼청동", "익선동", "혜화동"]),
            district!("중구", dongs: &["명동", "을지로동", "신당동"]),
            district!("성동구", dongs: &["성수동", "옥수동"]),
            district!("영등포구", dongs: &["여의도동", "문래동"]),
            district!("강서구", dongs: &["화곡동", "마곡동"]),
        ],
    },
    BuiltinRegion {
        name: "경기",
        city_level: true,
        districts: &[
            district!("수원시", subs: &["장안구", "권선구", "팔달구", "영통구"]),
            district!("성남시", subs: &["수정구", "중원구", "분당구"]),
            district!("고양시", subs: &["덕양구", "일산동구", "일산서구"]),
            district!("용인시", subs: &["처인구", "기흥구", "수지구"]),
            district!("안양시", subs: &["만안구", "동안구"]),
            district!("안산시", subs: &["상록구", "단원구"]),
            district!("부천시"),
            district!("남양주시"),
            district!("파주시"),
            district!("김포시"),
            district!("광명시"),
            district!("하남시"),
        ],
    },
    BuiltinRegion {
        name: "인천",
        city_level: false,
        districts: &[
            district!("중구"),
            district!("연수구", dongs: &["송도동"]),
            district!("남동구"),
            district!("부평구"),
            district!("서구"),
        ],
    },
    BuiltinRegion {
        name: "부산",
        city_level: false,
        districts: &[
            district!("해운대구", dongs: &["우동", "중동", "좌동"]),
            district!("수영구", dongs: &["광안동", "남천동"]),
            district!("부산진구", dongs: &["전포동", "부전동"]),
            district!("중구", dongs: &["남포동", "광복동"]),
            district!("기장군"),
        ],
    },
    BuiltinRegion {
        name: "대구",
        city_level: false,
        districts: &[
            district!("중구", dongs: &["동인동", "삼덕동"]),
            district!("수성구"),
        ],
    },
    BuiltinRegion {
        name: "대전",
        city_level: false,
        districts: &[district!("서구"), district!("유성구")],
    },
    BuiltinRegion {
        name: "광주",
        city_level: false,
        districts: &[district!("동구"), district!("서구")],
    },
    BuiltinRegion {
        name: "강원",
        city_level: false,
        districts: &[
            district!("춘천시"),
            district!("강릉시", dongs: &["교동"]),
            district!("속초시"),
        ],
    },
    BuiltinRegion {
        name: "제주",
        city_level: false,
        districts: &[
            district!("제주시", dongs: &["노형동", "연동"]),
            district!("서귀포시", dongs: &["중문동"]),
        ],
    },
];

/// One second-level entry: a district (ordinary provinces) or a city (the
/// city-level province). `sub_districts` is only populated for cities that
/// carry the extra sub-level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_districts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighborhoods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub name: String,
    /// True for the province whose second level is cities (with optional
    /// sub-districts) rather than plain districts.
    #[serde(default)]
    pub city_level: bool,
    #[serde(default)]
    pub districts: Vec<DistrictEntry>,
}

/// The full hierarchy. Ordered, immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTable {
    regions: Vec<RegionEntry>,
}

impl RegionTable {
    #[must_use]
    pub fn new(regions: Vec<RegionEntry>) -> Self {
        Self { regions }
    }

    /// The compiled-in table, used until (or in place of) the server copy.
    #[must_use]
    pub fn builtin() -> Self {
        let regions = BUILTIN_REGIONS
            .iter()
            .map(|r| RegionEntry {
                name: r.name.to_string(),
                city_level: r.city_level,
                districts: r
                    .districts
                    .iter()
                    .map(|d| DistrictEntry {
                        name: d.name.to_string(),
                        sub_districts: d.sub_districts.iter().map(ToString::to_string).collect(),
                        neighborhoods: d.neighborhoods.iter().map(ToString::to_string).collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { regions }
    }

    /// Ordered region names, with the [`REGION_ALL`] sentinel first.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        std::iter::once(REGION_ALL)
            .chain(self.regions.iter().map(|r| r.name.as_str()))
            .collect()
    }

    #[must_use]
    pub fn has_region(&self, region: &str) -> bool {
        self.entry(region).is_some()
    }

    #[must_use]
    pub fn is_city_level(&self, region: &str) -> bool {
        self.entry(region).is_some_and(|r| r.city_level)
    }

    /// Ordered district names for an ordinary province. Empty for the
    /// sentinel, unknown regions, and the city-level province (use
    /// [`cities`](Self::cities) there).
    #[must_use]
    pub fn districts(&self, region: &str) -> Vec<&str> {
        match self.entry(region) {
            Some(r) if !r.city_level => r.districts.iter().map(|d| d.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Ordered city names for the city-level province. Empty elsewhere.
    #[must_use]
    pub fn cities(&self, region: &str) -> Vec<&str> {
        match self.entry(region) {
            Some(r) if r.city_level => r.districts.iter().map(|d| d.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Ordered sub-district names for a city of the city-level province.
    /// Empty for cities without the extra sub-level and for unknown input.
    #[must_use]
    pub fn sub_districts(&self, region: &str, city: &str) -> Vec<&str> {
        match self.entry(region) {
            Some(r) if r.city_level => r
                .districts
                .iter()
                .find(|d| d.name == city)
                .map(|d| d.sub_districts.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn city_has_sub_districts(&self, region: &str, city: &str) -> bool {
        !self.sub_districts(region, city).is_empty()
    }

    /// Ordered neighborhood names under (region, district). Empty when the
    /// district is unset or unknown.
    #[must_use]
    pub fn neighborhoods(&self, region: &str, district: &str) -> Vec<&str> {
        self.entry(region)
            .and_then(|r| r.districts.iter().find(|d| d.name == district))
            .map(|d| d.neighborhoods.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Display label for a city-level choice.
    ///
    /// A city with sub-districts labels as `"{city} {sub}"` once both are
    /// chosen and as the empty string while the sub-district is still
    /// pending. A city without sub-districts labels as the city name alone.
    #[must_use]
    pub fn compose_city_label(&self, region: &str, city: &str, sub_district: Option<&str>) -> String {
        if self.city_has_sub_districts(region, city) {
            match sub_district {
                Some(sub) => format!("{city} {sub}"),
                None => String::new(),
            }
        } else {
            city.to_string()
        }
    }

    /// Display label for any district selection. Plain districts label
    /// verbatim; city selections go through [`compose_city_label`]
    /// (Self::compose_city_label).
    #[must_use]
    pub fn district_label(&self, region: &str, selection: &DistrictSelection) -> String {
        match selection {
            DistrictSelection::Plain { name } => name.clone(),
            DistrictSelection::City { city, sub_district } => {
                self.compose_city_label(region, city, sub_district.as_deref())
            }
        }
    }

    fn entry(&self, region: &str) -> Option<&RegionEntry> {
        self.regions.iter().find(|r| r.name == region)
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A second-level choice. The city form keeps city and sub-district as
/// separate fields rather than a space-delimited composite, so city names
/// containing spaces can never be misparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistrictSelection {
    Plain { name: String },
    City {
        city: String,
        sub_district: Option<String>,
    },
}

impl DistrictSelection {
    #[must_use]
    pub fn plain(name: impl Into<String>) -> Self {
        Self::Plain { name: name.into() }
    }

    #[must_use]
    pub fn city(city: impl Into<String>) -> Self {
        Self::City {
            city: city.into(),
            sub_district: None,
        }
    }

    #[must_use]
    pub fn city_name(&self) -> Option<&str> {
        match self {
            Self::Plain { .. } => None,
            Self::City { city, .. } => Some(city),
        }
    }

    #[must_use]
    pub fn sub_district(&self) -> Option<&str> {
        match self {
            Self::Plain { .. } => None,
            Self::City { sub_district, .. } => sub_district.as_deref(),
        }
    }
}

/// The user's current position in the hierarchy.
///
/// Invariant: neighborhood set ⇒ district set ⇒ region set to a concrete
/// (non-sentinel) region. The setters maintain it by cascade-clearing
/// everything below a changed level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSelection {
    region: String,
    district: Option<DistrictSelection>,
    neighborhood: Option<String>,
}

impl Default for RegionSelection {
    fn default() -> Self {
        Self {
            region: REGION_ALL.to_string(),
            district: None,
            neighborhood: None,
        }
    }
}

impl RegionSelection {
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn district(&self) -> Option<&DistrictSelection> {
        self.district.as_ref()
    }

    #[must_use]
    pub fn neighborhood(&self) -> Option<&str> {
        self.neighborhood.as_deref()
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.region == REGION_ALL
    }

    /// Selecting a region discards district and neighborhood, even when the
    /// same region is re-selected.
    pub fn set_region(&mut self, region: impl Into<String>) {
        self.region = region.into();
        self.district = None;
        self.neighborhood = None;
    }

    /// Selecting a district discards the neighborhood. Ignored while the
    /// sentinel region is active; returns whether the selection applied.
    pub fn set_district(&mut self, district: DistrictSelection) -> bool {
        if self.is_all() {
            return false;
        }
        self.district = Some(district);
        self.neighborhood = None;
        true
    }

    /// Completes a pending city choice with its sub-district. Ignored unless
    /// a city is currently selected.
    pub fn set_sub_district(&mut self, sub_district: impl Into<String>) -> bool {
        match &mut self.district {
            Some(DistrictSelection::City { sub_district: slot, .. }) => {
                *slot = Some(sub_district.into());
                self.neighborhood = None;
                true
            }
            _ => false,
        }
    }

    /// Ignored unless a district is selected.
    pub fn set_neighborhood(&mut self, neighborhood: impl Into<String>) -> bool {
        if self.district.is_none() {
            return false;
        }
        self.neighborhood = Some(neighborhood.into());
        true
    }

    pub fn clear_district(&mut self) {
        self.district = None;
        self.neighborhood = None;
    }

    pub fn clear_neighborhood(&mut self) {
        self.neighborhood = None;
    }

    /// The label the UI shows for the second level; empty while unset or
    /// while a city's sub-district is still pending.
    #[must_use]
    pub fn district_label(&self, table: &RegionTable) -> String {
        self.district
            .as_ref()
            .map(|d| table.district_label(&self.region, d))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_hierarchy_valid(&self) -> bool {
        if self.neighborhood.is_some() && self.district.is_none() {
            return false;
        }
        if self.district.is_some() && self.is_all() {
            return false;
        }
        true
    }
}
