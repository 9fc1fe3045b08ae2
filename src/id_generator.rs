use rand::{distr::Alphanumeric, Rng};

pub const GENERATED_ID_LEN: usize = 12;

/// Source of identifiers for configuration entries that do not carry one.
///
/// Ids only have to be unique, they carry no security meaning.
pub trait IdGenerator {
    fn generate(&mut self) -> String;
}

/// Lowercase alphanumeric ids, which are also valid Homie ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&mut self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_ID_LEN)
            .map(|c| char::from(c).to_ascii_lowercase())
            .collect()
    }
}

/// Predictable ids (`<prefix>-1`, `<prefix>-2`, ...).
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
