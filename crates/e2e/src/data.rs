//! Generated test data
//!
//! Every test gets fresh values so that registrations never collide with
//! earlier runs.

use std::collections::BTreeSet;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ADJECTIVES: &[&str] = &[
    "blue", "red", "green", "happy", "swift", "bright", "calm", "bold", "wise", "quick", "smart",
    "cool", "warm", "fresh", "clear", "pure", "silver", "golden", "wild", "gentle", "strong",
    "brave", "proud", "noble",
];

pub const PLACE_NOUNS: &[&str] = &[
    "ocean", "mountain", "river", "forest", "cloud", "star", "moon", "sun", "wind", "stone",
    "tree", "flower", "bird", "fish", "wave", "sky", "cocoon", "valley", "peak", "meadow",
    "spring", "autumn", "winter", "summer",
];

pub const ANIMAL_NOUNS: &[&str] = &[
    "tiger", "eagle", "wolf", "bear", "lion", "hawk", "fox", "deer", "rabbit", "goat", "horse",
    "dragon", "phoenix", "whale", "dolphin", "owl", "panda", "koala", "zebra", "giraffe",
    "elephant", "rhino", "leopard", "cheetah",
];

/// Extensions rotated through when generating a list
pub const DOMAIN_EXTENSIONS: &[&str] = &["com", "org", "net", "io", "co"];

pub const BUSINESS_PASSWORD: &str = "SecurePass123!";
pub const DEFAULT_DATE_OF_BIRTH: &str = "1990-01-01";

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &[&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

fn random_id<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}

/// `{adjective}{noun}{animal}.{extension}`
pub fn random_domain<R: Rng + ?Sized>(rng: &mut R, extension: &str) -> String {
    format!(
        "{}{}{}.{}",
        pick(rng, ADJECTIVES),
        pick(rng, PLACE_NOUNS),
        pick(rng, ANIMAL_NOUNS),
        extension
    )
}

/// Up to `count` distinct domains, giving up after `count * 10` draws
pub fn random_domain_list<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut domains = Vec::with_capacity(count);
    let max_draws = count * 10;
    let mut draws = 0;

    while domains.len() < count && draws < max_draws {
        let extension = DOMAIN_EXTENSIONS[domains.len() % DOMAIN_EXTENSIONS.len()];
        let domain = random_domain(rng, extension);
        if seen.insert(domain.clone()) {
            domains.push(domain);
        }
        draws += 1;
    }

    domains
}

pub fn unique_email<R: Rng + ?Sized>(rng: &mut R, prefix: &str, domain: &str) -> String {
    format!(
        "{}-{}-{}@{}",
        prefix,
        Utc::now().timestamp_millis(),
        random_id(rng, 7),
        domain
    )
}

pub fn unique_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "user{}{}",
        Utc::now().timestamp_millis(),
        rng.gen_range(0..10_000)
    )
}

/// A password that satisfies the sign-up rules: upper, lower, digit, symbol, 8+
pub fn valid_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Vm{}#{}x", random_id(rng, 6), rng.gen_range(10..100))
}

/// Fresh data for one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TestData {
    pub timestamp: i64,
    pub random_id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub business_password: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub date_of_birth: String,
    /// Primary domain candidate
    pub domain: String,
    pub domains: Vec<String>,
}

impl TestData {
    pub fn generate(domain_count: usize) -> Self {
        Self::generate_with(&mut rand::thread_rng(), domain_count)
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, domain_count: usize) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        let random_id = random_id(rng, 7);
        let domains = random_domain_list(rng, domain_count.max(1));

        Self {
            timestamp,
            email: format!("bizuser-{}-{}@yopmail.com", timestamp, random_id),
            username: format!("testuser{}{}", random_id, timestamp),
            password: valid_password(rng),
            business_password: BUSINESS_PASSWORD.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            company_name: format!("Test Company {}", timestamp),
            date_of_birth: DEFAULT_DATE_OF_BIRTH.to_string(),
            domain: domains.first().cloned().unwrap_or_default(),
            domains,
            random_id,
        }
    }

    /// Look up a field by its template name
    pub fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "timestamp" => self.timestamp.to_string(),
            "random_id" => self.random_id.clone(),
            "email" => self.email.clone(),
            "username" => self.username.clone(),
            "password" => self.password.clone(),
            "business_password" => self.business_password.clone(),
            "first_name" => self.first_name.clone(),
            "last_name" => self.last_name.clone(),
            "company_name" => self.company_name.clone(),
            "date_of_birth" => self.date_of_birth.clone(),
            "domain" => self.domain.clone(),
            _ => return None,
        })
    }
}
