use serde::{Deserialize, Serialize};

const EAST_JAVA: [&str; 20] = [
    "Surabaya",
    "Malang",
    "Kediri",
    "Blitar",
    "Madiun",
    "Mojokerto",
    "Pasuruan",
    "Probolinggo",
    "Sidoarjo",
    "Gresik",
    "Jember",
    "Banyuwangi",
    "Tulungagung",
    "Lumajang",
    "Bondowoso",
    "Situbondo",
    "Ngawi",
    "Bojonegoro",
    "Tuban",
    "Lamongan",
];

/// A district and the locality/region/country terms used to geocode it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictQuery {
    pub name: String,
    pub terms: [String; 3],
}

impl DistrictQuery {
    pub fn new(name: impl Into<String>, terms: [&str; 3]) -> Self {
        Self { name: name.into(), terms: terms.map(str::to_owned) }
    }

    /// Free-text location query, e.g. `Malang, East Java, Indonesia`.
    pub fn query(&self) -> String {
        self.terms.join(", ")
    }
}

/// The fixed set of districts fetched in every round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    districts: Vec<DistrictQuery>,
}

impl Registry {
    pub fn new(districts: Vec<DistrictQuery>) -> Self {
        Self { districts }
    }

    /// The built-in East Java district list.
    pub fn east_java() -> Self {
        Self::new(
            EAST_JAVA
                .iter()
                .map(|&name| DistrictQuery::new(name, [name, "East Java", "Indonesia"]))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistrictQuery> {
        self.districts.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DistrictQuery> {
        self.districts.iter().find(|d| d.name == name)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::east_java()
    }
}
