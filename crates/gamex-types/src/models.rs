use serde::{Deserialize, Serialize};

/// A catalog entry. Field names and order match the on-disk JSON document,
/// so changing them breaks existing `data.json` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub category: String,
    /// Unix seconds. Only relational rows without a timestamp carry `None`.
    pub created_at: Option<i64>,
}

/// The fixed category set. Declaration order matters: the first variant is
/// what invalid input snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Second Hand")]
    SecondHand,
    Computer,
    Printer,
    Tabs,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::SecondHand,
        Category::Computer,
        Category::Printer,
        Category::Tabs,
        Category::Accessories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::SecondHand => "Second Hand",
            Category::Computer => "Computer",
            Category::Printer => "Printer",
            Category::Tabs => "Tabs",
            Category::Accessories => "Accessories",
        }
    }

    /// Exact, case-sensitive match against the display names.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }

    /// Coerce free-form input into the set, falling back to the first entry.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Self::ALL[0])
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied fields for create and update. Both backends normalize it
/// the same way before writing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductInput {
    pub fn new(
        title: impl Into<String>,
        desc: impl Into<String>,
        photo: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            desc: desc.into(),
            photo: photo.into(),
            category: Some(category.into()),
        }
    }

    pub fn normalized(&self) -> NormalizedInput {
        NormalizedInput {
            title: self.title.trim().to_string(),
            desc: self.desc.trim().to_string(),
            photo: self.photo.trim().to_string(),
            category: Category::normalize(self.category.as_deref()),
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Trimmed fields with the category snapped into the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub title: String,
    pub desc: String,
    pub photo: String,
    pub category: Category,
}

impl NormalizedInput {
    /// Overwrite the mutable fields of an existing product. `id` and
    /// `created_at` are left alone.
    pub fn apply_to(self, product: &mut Product) {
        product.title = self.title;
        product.desc = self.desc;
        product.photo = self.photo;
        product.category = self.category.as_str().to_string();
    }

    pub fn into_product(self, id: i64, created_at: i64) -> Product {
        Product {
            id,
            title: self.title,
            desc: self.desc,
            photo: self.photo,
            category: self.category.as_str().to_string(),
            created_at: Some(created_at),
        }
    }
}

/// Public business card shown on the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub brand: String,
    pub tagline: String,
    pub owner_title: String,
    pub phone_display: String,
    pub phone_raw: String,
    pub email: String,
    pub maps_link: String,
    pub instagram: String,
    pub facebook: String,
    pub youtube: String,
    pub map_review: String,
    pub wa_group: String,
    pub address: String,
    pub avatar: String,
    pub logo: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            brand: "GameX PC Hub".into(),
            tagline: "Custom Gaming PC • Laptops • Accessories".into(),
            owner_title: "Owner".into(),
            phone_display: String::new(),
            phone_raw: String::new(),
            email: String::new(),
            maps_link: String::new(),
            instagram: String::new(),
            facebook: String::new(),
            youtube: String::new(),
            map_review: String::new(),
            wa_group: String::new(),
            address: String::new(),
            avatar: String::new(),
            logo: String::new(),
        }
    }
}
