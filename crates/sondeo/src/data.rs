//! Test data: JSON fixture files and randomized entity synthesis.
//!
//! Fixtures are read from the data directory once and cached by file name.
//! Synthesized users, products and orders are plain serde records; a seeded
//! manager produces the same sequence on every run.

use crate::result::{SondeoError, SondeoResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Sales tax applied to order subtotals
pub const TAX_RATE: f64 = 0.08;

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Carmen", "Dmitri", "Elena", "Farah", "Gustavo", "Hana", "Ivan", "Julia",
    "Kenji", "Lucia", "Mateo", "Nadia", "Omar", "Priya",
];
const LAST_NAMES: &[&str] = &[
    "Garcia", "Novak", "Okafor", "Schmidt", "Tanaka", "Rossi", "Silva", "Kowalski", "Haddad",
    "Larsen", "Moreau", "Petrov",
];
const CITIES: &[(&str, &str)] = &[
    ("Portland", "OR"),
    ("Austin", "TX"),
    ("Denver", "CO"),
    ("Raleigh", "NC"),
    ("Madison", "WI"),
    ("Tucson", "AZ"),
];
const STREETS: &[&str] = &["Oak St", "Maple Ave", "Pine Rd", "Cedar Ln", "Elm Dr", "Birch Way"];
const ADJECTIVES: &[&str] = &["Compact", "Wireless", "Ergonomic", "Rugged", "Smart", "Classic"];
const NOUNS: &[&str] = &["Keyboard", "Headphones", "Lamp", "Backpack", "Kettle", "Monitor"];
const CATEGORIES: &[&str] = &["electronics", "home", "outdoors", "office", "kitchen"];

/// Round a money amount to cents
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Postal address of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Admin,
}

/// Synthesized user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone: String,
    pub address: Address,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Synthesized catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub sku: String,
    pub category: String,
    pub price: f64,
    pub stock: u32,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// `quantity * unit_price`, rounded to cents
    pub subtotal: f64,
}

/// Order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

const ORDER_STATUSES: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

/// Synthesized order with priced lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Kind of record to synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureKind {
    User,
    Product,
    Order,
}

impl FixtureKind {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Product => "product",
            Self::Order => "order",
        }
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixtureKind {
    type Err = SondeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(Self::User),
            "product" | "products" => Ok(Self::Product),
            "order" | "orders" => Ok(Self::Order),
            other => Err(SondeoError::config(format!(
                "unknown fixture kind '{other}' (expected user, product or order)"
            ))),
        }
    }
}

/// Any synthesized record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    User(User),
    Product(Product),
    Order(Order),
}

impl Record {
    /// Kind of this record
    #[must_use]
    pub const fn kind(&self) -> FixtureKind {
        match self {
            Self::User(_) => FixtureKind::User,
            Self::Product(_) => FixtureKind::Product,
            Self::Order(_) => FixtureKind::Order,
        }
    }
}

/// Output of [`TestDataManager::generate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Generated {
    /// Exactly one record was requested
    One(Record),
    /// Any other count, including zero
    Many(Vec<Record>),
}

impl Generated {
    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    /// Whether no record was generated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into a vector
    #[must_use]
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Fixture loader and record synthesizer
#[derive(Debug)]
pub struct TestDataManager {
    data_dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<Value>>>,
    file_reads: AtomicUsize,
    rng: Mutex<StdRng>,
}

impl TestDataManager {
    /// Manager over a data directory with an entropy-seeded generator
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: Mutex::new(HashMap::new()),
            file_reads: AtomicUsize::new(0),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reseed for a reproducible sequence
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Number of fixture files read from disk so far
    #[must_use]
    pub fn file_reads(&self) -> usize {
        self.file_reads.load(Ordering::SeqCst)
    }

    fn file_name(name: &str) -> String {
        if Path::new(name).extension().is_some_and(|ext| ext == "json") {
            name.to_string()
        } else {
            format!("{name}.json")
        }
    }

    /// Load `<data_dir>/<name>.json`, reading the file at most once
    pub fn load_fixture(&self, name: &str) -> SondeoResult<Arc<Value>> {
        let file_name = Self::file_name(name);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = cache.get(&file_name) {
            return Ok(Arc::clone(value));
        }

        let path = self.data_dir.join(&file_name);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SondeoError::FixtureNotFound {
                name: name.to_string(),
                path: path.clone(),
            },
            _ => SondeoError::Io(e),
        })?;
        self.file_reads.fetch_add(1, Ordering::SeqCst);

        let value: Value = serde_json::from_str(&content).map_err(|source| {
            SondeoError::FixtureParse {
                name: name.to_string(),
                source,
            }
        })?;
        let value = Arc::new(value);
        cache.insert(file_name, Arc::clone(&value));
        tracing::debug!(fixture = name, path = %path.display(), "loaded fixture");
        Ok(value)
    }

    /// Load a fixture into a typed record
    pub fn load_fixture_as<T: DeserializeOwned>(&self, name: &str) -> SondeoResult<T> {
        let value = self.load_fixture(name)?;
        T::deserialize(value.as_ref()).map_err(|source| SondeoError::FixtureParse {
            name: name.to_string(),
            source,
        })
    }

    /// Drop all cached fixtures
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Write records as pretty JSON to `<data_dir>/<name>.json`
    pub fn save_records<T: Serialize + ?Sized>(&self, name: &str, records: &T) -> SondeoResult<PathBuf> {
        let file_name = Self::file_name(name);
        std::fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(&file_name);
        std::fs::write(&path, serde_json::to_string_pretty(records)?)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&file_name);
        tracing::info!(path = %path.display(), "saved test data");
        Ok(path)
    }

    /// Synthesize `count` records of a kind
    #[must_use]
    pub fn generate(&self, kind: FixtureKind, count: usize) -> Generated {
        let mut records: Vec<Record> = (0..count)
            .map(|_| match kind {
                FixtureKind::User => Record::User(self.user()),
                FixtureKind::Product => Record::Product(self.product()),
                FixtureKind::Order => Record::Order(self.order()),
            })
            .collect();
        if count == 1 {
            if let Some(record) = records.pop() {
                return Generated::One(record);
            }
        }
        Generated::Many(records)
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Synthesize one user
    #[must_use]
    pub fn user(&self) -> User {
        self.with_rng(|rng| {
            let first_name = pick(rng, FIRST_NAMES);
            let last_name = pick(rng, LAST_NAMES);
            let id = random_uuid(rng);
            let tag = id.simple().to_string()[..6].to_string();
            let username = format!("{}.{}{tag}", first_name, last_name).to_ascii_lowercase();
            let (city, state) = *CITIES.choose(rng).unwrap_or(&CITIES[0]);
            User {
                id,
                email: format!("{username}@example.test"),
                password: random_password(rng),
                phone: format!(
                    "+1-555-{:03}-{:04}",
                    rng.gen_range(100..1000),
                    rng.gen_range(0..10_000)
                ),
                address: Address {
                    street: format!("{} {}", rng.gen_range(1..9999), pick(rng, STREETS)),
                    city: city.to_string(),
                    state: state.to_string(),
                    zip_code: format!("{:05}", rng.gen_range(10_000..99_999)),
                    country: "US".to_string(),
                },
                role: if rng.gen_bool(0.1) {
                    UserRole::Admin
                } else {
                    UserRole::Customer
                },
                is_active: rng.gen_bool(0.9),
                created_at: past(rng, 365),
                first_name,
                last_name,
                username,
            }
        })
    }

    /// Synthesize one product
    #[must_use]
    pub fn product(&self) -> Product {
        self.with_rng(product_with)
    }

    /// Synthesize one order of 1 to 5 lines
    #[must_use]
    pub fn order(&self) -> Order {
        self.with_rng(|rng| {
            let lines = rng.gen_range(1..=5);
            let items: Vec<OrderItem> = (0..lines)
                .map(|_| {
                    let product = product_with(rng);
                    let quantity: u32 = rng.gen_range(1..=4);
                    OrderItem {
                        product_id: product.id,
                        product_name: product.name,
                        quantity,
                        unit_price: product.price,
                        subtotal: round_cents(f64::from(quantity) * product.price),
                    }
                })
                .collect();
            let subtotal = round_cents(items.iter().map(|item| item.subtotal).sum());
            let tax = round_cents(subtotal * TAX_RATE);
            let shipping = round_cents(rng.gen_range(0.0..25.0));
            Order {
                id: random_uuid(rng),
                user_id: random_uuid(rng),
                total: round_cents(subtotal + tax + shipping),
                items,
                subtotal,
                tax,
                shipping,
                status: *ORDER_STATUSES.choose(rng).unwrap_or(&OrderStatus::Pending),
                created_at: past(rng, 90),
            }
        })
    }
}

fn pick(rng: &mut StdRng, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

fn random_uuid(rng: &mut StdRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

fn past(rng: &mut StdRng, max_days: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::minutes(rng.gen_range(0..max_days * 24 * 60))
}

/// Password with every character class, including symbols
fn random_password(rng: &mut StdRng) -> String {
    const LOWER: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"23456789";
    const SYMBOLS: &[u8] = b"!@#$%^&*";
    let mut chars: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS]
        .iter()
        .filter_map(|class| class.choose(rng).copied())
        .collect();
    let all: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS].concat();
    chars.extend((0..8).filter_map(|_| all.choose(rng).copied()));
    chars.shuffle(rng);
    String::from_utf8_lossy(&chars).into_owned()
}

fn product_with(rng: &mut StdRng) -> Product {
    let adjective = pick(rng, ADJECTIVES);
    let noun = pick(rng, NOUNS);
    let category = pick(rng, CATEGORIES);
    let id = random_uuid(rng);
    Product {
        sku: format!(
            "{}-{}",
            category[..3].to_ascii_uppercase(),
            &id.simple().to_string()[..8].to_ascii_uppercase()
        ),
        description: format!("{adjective} {} for everyday use", noun.to_lowercase()),
        name: format!("{adjective} {noun}"),
        category,
        price: round_cents(rng.gen_range(1.0..500.0)),
        stock: rng.gen_range(0..1000),
        rating: (rng.gen_range(10..=50) as f64) / 10.0,
        created_at: past(rng, 730),
        id,
    }
}
