//! Per-run unique test identity
//!
//! The admin UI never exposes backend-assigned ids, so every entity the
//! scenario creates carries a name derived from a fresh random suffix.
//! Later steps correlate UI-created entities with API records by matching
//! on those generated names.

use rand::Rng;
use uuid::Uuid;

/// Fixture constants that do not need to be unique per run
pub const BANK_NAME: &str = "Consorcio Bank";
pub const BANK_AGENCY: &str = "1234";
pub const BANK_ACCOUNT: &str = "567890";
pub const PARTICIPANT_ADDRESS: &str = "Rua das Acacias, 123 - Sao Paulo/SP";

/// All generated identity data for one scenario run
#[derive(Debug, Clone)]
pub struct RunIdentity {
    pub suffix: String,
    pub participant_name: String,
    pub participant_email: String,
    pub participant_document: String,
    pub participant_phone: String,
    pub group_name: String,
    pub group_description: String,
    pub account_holder_name: String,
    pub assembly_description: String,
}

impl RunIdentity {
    /// Generate a fresh identity from a random 8-char suffix
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self::from_suffix(suffix)
    }

    fn from_suffix(suffix: String) -> Self {
        Self {
            participant_name: format!("Participante QA {}", suffix),
            participant_email: format!("participante.qa.{}@example.com", suffix),
            participant_document: generate_cpf(),
            participant_phone: generate_phone(),
            group_name: format!("Grupo QA {}", suffix),
            group_description: format!("Grupo criado via e2e {}", suffix),
            account_holder_name: format!("Titular QA {}", suffix),
            assembly_description: format!("Assembleia de abertura e2e {}", suffix),
            suffix,
        }
    }
}

/// 11 random digits in the national tax-id display format XXX.XXX.XXX-XX
pub fn generate_cpf() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..11).map(|_| rng.gen_range(0..10).to_string()).collect();
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// Mobile phone in the display format (11) 9XXXX-XXXX
pub fn generate_phone() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..8).map(|_| rng.gen_range(0..10).to_string()).collect();
    format!("(11) 9{}-{}", &digits[0..4], &digits[4..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf_format() {
        for _ in 0..100 {
            let cpf = generate_cpf();
            assert_eq!(cpf.len(), 14, "{}", cpf);
            let digits: Vec<char> = cpf.chars().filter(|c| c.is_ascii_digit()).collect();
            assert_eq!(digits.len(), 11, "{}", cpf);
            assert_eq!(cpf.as_bytes()[3], b'.');
            assert_eq!(cpf.as_bytes()[7], b'.');
            assert_eq!(cpf.as_bytes()[11], b'-');
        }
    }

    #[test]
    fn test_phone_format() {
        for _ in 0..100 {
            let phone = generate_phone();
            assert_eq!(phone.len(), 15, "{}", phone);
            assert!(phone.starts_with("(11) 9"), "{}", phone);
            assert_eq!(phone.as_bytes()[10], b'-');
            let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
            assert_eq!(digits.len(), 11, "{}", phone);
        }
    }

    #[test]
    fn test_identities_are_unique_per_run() {
        let a = RunIdentity::generate();
        let b = RunIdentity::generate();
        assert_ne!(a.suffix, b.suffix);
        assert_ne!(a.participant_email, b.participant_email);
        assert_ne!(a.group_name, b.group_name);
    }

    #[test]
    fn test_generated_names_carry_suffix() {
        let identity = RunIdentity::generate();
        assert!(identity.participant_name.ends_with(&identity.suffix));
        assert!(identity.participant_email.contains(&identity.suffix));
        assert!(identity.group_name.ends_with(&identity.suffix));
        assert!(identity.assembly_description.ends_with(&identity.suffix));
    }
}
