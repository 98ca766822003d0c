// ============================================================================
// Structure : Asset
// ============================================================================
// Représente un asset Stellar : soit la monnaie native (XLM), soit un
// couple (code, issuer)
//
// CONCEPTS RUST :
// 1. Enum avec données : Native (sans données) vs Credit { code, issuer }
// 2. FromStr / Display : conversion texte <-> type (paramètres d'URL)
// 3. thiserror : erreurs typées pour le décodage
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Valeur du paramètre d'URL pour la monnaie native
pub const NATIVE_PARAM: &str = "native";

/// Code de la monnaie native du réseau Stellar
pub const NATIVE_CODE: &str = "XLM";

/// Longueur d'un account id Stellar (clé publique encodée en base32)
const ACCOUNT_ID_LEN: usize = 56;

/// Longueur maximale d'un code d'asset (alphanum12)
const MAX_CODE_LEN: usize = 12;

/// Erreur de décodage d'un asset depuis un paramètre d'URL
///
/// CONCEPT RUST : thiserror
/// - #[derive(Error)] implémente std::error::Error
/// - #[error("...")] génère l'implémentation de Display
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("paramètre d'asset vide")]
    Empty,

    #[error("format CODE:ISSUER attendu, reçu {0:?}")]
    MissingIssuer(String),

    #[error("code d'asset invalide : {0:?}")]
    InvalidCode(String),

    #[error("issuer invalide : {0:?}")]
    InvalidIssuer(String),
}

/// Asset Stellar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    /// Monnaie native (lumens), pas d'issuer
    Native,

    /// Asset émis par un compte
    Credit { code: String, issuer: String },
}

impl Asset {
    /// Retourne la monnaie native
    pub fn native() -> Self {
        Asset::Native
    }

    /// Crée un asset émis en validant le code et l'issuer
    ///
    /// CONCEPT RUST : Constructeur faillible
    /// - Retourne Result<Self, DecodeError> au lieu de paniquer
    /// - Même règles que le SDK Stellar : code 1-12 alphanumérique,
    ///   issuer = account id "G..." de 56 caractères
    pub fn credit(code: &str, issuer: &str) -> Result<Self, DecodeError> {
        if !is_valid_code(code) {
            return Err(DecodeError::InvalidCode(code.to_string()));
        }
        if !is_valid_account_id(issuer) {
            return Err(DecodeError::InvalidIssuer(issuer.to_string()));
        }

        Ok(Asset::Credit {
            code: code.to_string(),
            issuer: issuer.to_string(),
        })
    }

    /// Construit un asset depuis un code et un issuer optionnel
    ///
    /// "XLM" sans issuer désigne la monnaie native
    pub fn from_parts(code: &str, issuer: Option<&str>) -> Result<Self, DecodeError> {
        match issuer.filter(|issuer| !issuer.is_empty()) {
            None if code == NATIVE_CODE || code == NATIVE_PARAM || code.is_empty() => {
                Ok(Asset::Native)
            }
            None => Err(DecodeError::MissingIssuer(code.to_string())),
            Some(issuer) => Asset::credit(code, issuer),
        }
    }

    /// Vérifie si c'est la monnaie native
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// Code de l'asset ("XLM" pour la monnaie native)
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_CODE,
            Asset::Credit { code, .. } => code,
        }
    }

    /// Issuer de l'asset (None pour la monnaie native)
    pub fn issuer(&self) -> Option<&str> {
        match self {
            Asset::Native => None,
            Asset::Credit { issuer, .. } => Some(issuer),
        }
    }

    /// Encode l'asset pour un paramètre d'URL
    ///
    /// Format : "native" ou "CODE:ISSUER"
    pub fn to_url_param(&self) -> String {
        match self {
            Asset::Native => NATIVE_PARAM.to_string(),
            Asset::Credit { code, issuer } => format!("{}:{}", code, issuer),
        }
    }

    /// Décode un paramètre d'URL en asset
    ///
    /// CONCEPT RUST : split_once
    /// - Découpe sur le premier ':' et retourne Option<(&str, &str)>
    /// - None si le séparateur est absent
    pub fn from_url_param(param: &str) -> Result<Self, DecodeError> {
        if param.is_empty() {
            return Err(DecodeError::Empty);
        }
        if param == NATIVE_PARAM {
            return Ok(Asset::Native);
        }

        match param.split_once(':') {
            Some((code, issuer)) => Asset::credit(code, issuer),
            None => Asset::from_parts(param, None),
        }
    }

    /// Forme simple {code, issuer} utilisée par le store d'assets
    pub fn to_simple(&self) -> AssetSimple {
        AssetSimple {
            code: self.code().to_string(),
            issuer: self.issuer().map(str::to_string),
        }
    }
}

impl fmt::Display for Asset {
    /// Affiche le code, suivi des 4 derniers caractères de l'issuer
    ///
    /// Format : "XLM" ou "AQUA (…AQUA)"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "{}", NATIVE_CODE),
            Asset::Credit { code, issuer } => {
                let skip = issuer.chars().count().saturating_sub(4);
                let suffix: String = issuer.chars().skip(skip).collect();
                write!(f, "{} (…{})", code, suffix)
            }
        }
    }
}

impl FromStr for Asset {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Asset::from_url_param(s)
    }
}

/// Référence simple à un asset, telle que retournée par l'API
///
/// L'issuer est absent (ou vide) pour la monnaie native
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetSimple {
    pub code: String,
    pub issuer: Option<String>,
}

impl AssetSimple {
    pub fn new(code: &str, issuer: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            issuer: issuer.filter(|issuer| !issuer.is_empty()).map(str::to_string),
        }
    }

    /// Convertit en Asset validé
    pub fn to_asset(&self) -> Result<Asset, DecodeError> {
        Asset::from_parts(&self.code, self.issuer.as_deref())
    }
}

/// Vérifie un code d'asset : 1 à 12 caractères ASCII alphanumériques
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Vérifie un account id Stellar : "G" + 55 caractères base32 (A-Z, 2-7)
pub fn is_valid_account_id(account_id: &str) -> bool {
    account_id.len() == ACCOUNT_ID_LEN
        && account_id.starts_with('G')
        && account_id
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "GBNZILSTVQZ4R7IKQDGHYGY2QXL5QOFJYQMXPKWRRM5PAV7Y4M67AQUA";

    #[test]
    fn test_native_round_trip() {
        assert_eq!(Asset::native().to_url_param(), "native");
        assert_eq!(Asset::from_url_param("native"), Ok(Asset::Native));
    }

    #[test]
    fn test_credit_round_trip() {
        let asset = Asset::credit("AQUA", ISSUER).unwrap();
        let param = asset.to_url_param();

        assert_eq!(param, format!("AQUA:{}", ISSUER));
        assert_eq!(Asset::from_url_param(&param), Ok(asset));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Asset::from_url_param(""), Err(DecodeError::Empty));
        assert!(matches!(
            Asset::from_url_param("USD"),
            Err(DecodeError::MissingIssuer(_))
        ));
        assert!(matches!(
            Asset::from_url_param("USD:ISSUER"),
            Err(DecodeError::InvalidIssuer(_))
        ));
        assert!(matches!(
            Asset::from_url_param(&format!("TOOLONGASSETCODE:{}", ISSUER)),
            Err(DecodeError::InvalidCode(_))
        ));
        assert!(matches!(
            Asset::from_url_param(&format!("US-D:{}", ISSUER)),
            Err(DecodeError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_xlm_without_issuer_is_native() {
        assert_eq!(Asset::from_url_param("XLM"), Ok(Asset::Native));
        assert_eq!(Asset::from_parts("XLM", Some("")), Ok(Asset::Native));
    }

    #[test]
    fn test_account_id_validation() {
        assert!(is_valid_account_id(ISSUER));
        assert!(!is_valid_account_id("GABC"));
        assert!(!is_valid_account_id(&ISSUER.replace('G', "S")));
        assert!(!is_valid_account_id(&ISSUER.to_lowercase()));
    }

    #[test]
    fn test_display() {
        let asset = Asset::credit("AQUA", ISSUER).unwrap();
        assert_eq!(asset.to_string(), "AQUA (…AQUA)");
        assert_eq!(Asset::Native.to_string(), "XLM");
    }

    #[test]
    fn test_simple_conversion() {
        let asset = Asset::credit("AQUA", ISSUER).unwrap();
        let simple = asset.to_simple();

        assert_eq!(simple.issuer.as_deref(), Some(ISSUER));
        assert_eq!(simple.to_asset(), Ok(asset));
        assert_eq!(AssetSimple::new("XLM", Some("")).to_asset(), Ok(Asset::Native));
    }
}
