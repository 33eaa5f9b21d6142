//! Token feature configuration.
//!
//! The wizard hands over a [`FeatureConfigDraft`] (plain strings, camelCase
//! JSON). [`FeatureConfigDraft::validate`] turns it into an immutable
//! [`FeatureConfig`], which is the only input the synthesizer accepts.

use std::collections::BTreeSet;

use alloy::primitives::{Address, U256};
use alloy::primitives::utils::parse_units;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigValidationError;
use crate::networks::Network;

/// Cooldown applied when anti-bot is selected without an explicit value.
pub const DEFAULT_TRADING_COOLDOWN_SECS: u64 = 30;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));
static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+").expect("valid regex"));
static DECIMAL_QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Feature enums
// ---------------------------------------------------------------------------

/// A closed set of wizard choices with stable wire names.
pub trait WizardOption: Sized + Copy + 'static {
    const FIELD: &'static str;
    const ALL: &'static [Self];

    fn wire_name(&self) -> &'static str;

    fn parse(value: &str) -> Result<Self, ConfigValidationError> {
        let needle = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|opt| opt.wire_name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ConfigValidationError::UnknownOption {
                field: Self::FIELD,
                value: value.to_string(),
            })
    }
}

macro_rules! wizard_option {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl WizardOption for $name {
            const FIELD: &'static str = $field;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn wire_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }
    };
}

wizard_option! {
    /// Access-control model. Exactly one is active.
    AccessControl, "accessControl" {
        None => "none",
        Ownable => "ownable",
        Roles => "roles",
        Manager => "manager",
    }
}

wizard_option! {
    /// Optional standard token functions. Declaration order is the
    /// inheritance order of their mixins.
    StandardFunction, "standardFunctions" {
        Mint => "mint",
        Burn => "burn",
        Pause => "pause",
        Cap => "cap",
    }
}

wizard_option! {
    /// Transfer-time anti-abuse guards.
    SecurityFunction, "securityFunctions" {
        AntiWhale => "antiwhale",
        AntiBot => "antibot",
        Blacklist => "blacklist",
        Allowlist => "allowlist",
    }
}

wizard_option! {
    /// Tax options. Captured but not part of generated source yet.
    TaxFunction, "taxFunctions" {
        Dividends => "dividends",
        TreasuryFee => "treasuryFee",
        AutoLp => "autoLP",
        AutoBurn => "autoBurn",
    }
}

wizard_option! {
    /// Proxy pattern selection. Captured but not part of generated source yet.
    Upgradeability, "upgradeability" {
        None => "none",
        Transparent => "transparent",
        Uups => "uups",
    }
}

wizard_option! {
    PresaleType, "presaleType" {
        None => "none",
        Ico => "ico",
        Ido => "ido",
        Launchpad => "launchpad",
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// A token quantity as entered, plus its value in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    entered: String,
    base_units: U256,
}

impl TokenAmount {
    fn parse(field: &'static str, value: &str, decimals: u8) -> Result<Self, ConfigValidationError> {
        let entered = value.trim();
        let invalid = |reason: String| ConfigValidationError::InvalidNumber {
            field,
            value: value.to_string(),
            reason,
        };

        if !DECIMAL_QUANTITY.is_match(entered) {
            return Err(invalid("expected a non-negative decimal quantity".into()));
        }
        let base_units = parse_units(entered, decimals)
            .map_err(|e| invalid(e.to_string()))?
            .get_absolute();

        Ok(Self {
            entered: entered.to_string(),
            base_units,
        })
    }

    /// The quantity as the user typed it (whole tokens).
    pub fn entered(&self) -> &str {
        &self.entered
    }

    /// The quantity scaled by `10^decimals`.
    pub fn base_units(&self) -> U256 {
        self.base_units
    }
}

/// Anti-whale limits, both required when the guard is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiWhaleLimits {
    pub max_holder_limit: TokenAmount,
    pub max_transaction_amount: TokenAmount,
}

// ---------------------------------------------------------------------------
// Draft (wizard payload)
// ---------------------------------------------------------------------------

/// The raw configuration collected by the wizard, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureConfigDraft {
    pub network: String,
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: String,
    pub initial_supply: String,
    pub max_supply: Option<String>,
    pub access_control: String,
    /// `AccessManager` contract that governs a manager-controlled token.
    pub access_manager: Option<String>,
    pub standard_functions: Vec<String>,
    pub security_functions: Vec<String>,
    pub tax_functions: Vec<String>,
    pub upgradeability: String,
    pub presale_type: String,
    pub max_holder_limit: Option<String>,
    pub max_transaction_amount: Option<String>,
    pub trading_cooldown: Option<String>,
}

impl Default for FeatureConfigDraft {
    fn default() -> Self {
        Self {
            network: String::new(),
            token_name: String::new(),
            token_symbol: String::new(),
            decimals: "18".into(),
            initial_supply: String::new(),
            max_supply: None,
            access_control: "none".into(),
            access_manager: None,
            standard_functions: Vec::new(),
            security_functions: Vec::new(),
            tax_functions: Vec::new(),
            upgradeability: "none".into(),
            presale_type: "none".into(),
            max_holder_limit: None,
            max_transaction_amount: None,
            trading_cooldown: None,
        }
    }
}

impl FeatureConfigDraft {
    /// Validate the draft and freeze it into a [`FeatureConfig`].
    pub fn validate(&self) -> Result<FeatureConfig, ConfigValidationError> {
        let network = required(&self.network, "network")?;
        let network: Network = network
            .parse()
            .map_err(|_| ConfigValidationError::UnknownOption {
                field: "network",
                value: self.network.clone(),
            })?;

        let token_name = required(&self.token_name, "tokenName")?.to_string();
        let token_symbol = required(&self.token_symbol, "tokenSymbol")?.to_string();
        let contract_name = contract_identifier(&token_name)
            .ok_or_else(|| ConfigValidationError::InvalidContractName(token_name.clone()))?;

        let decimals_raw = if self.decimals.trim().is_empty() {
            "18"
        } else {
            self.decimals.trim()
        };
        let decimals: u8 = decimals_raw
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigValidationError::InvalidNumber {
                field: "decimals",
                value: self.decimals.clone(),
                reason: e.to_string(),
            })?;

        let initial_supply = TokenAmount::parse(
            "initialSupply",
            required(&self.initial_supply, "initialSupply")?,
            decimals,
        )?;

        let access_control = AccessControl::parse(&self.access_control)?;
        let access_manager = if access_control == AccessControl::Manager {
            let raw = optional_required(&self.access_manager, "accessManager")?;
            Some(parse_authority(raw)?)
        } else {
            None
        };
        let standard_functions = parse_set::<StandardFunction>(&self.standard_functions)?;
        let security_functions = parse_set::<SecurityFunction>(&self.security_functions)?;
        let tax_functions = parse_set::<TaxFunction>(&self.tax_functions)?;
        let upgradeability = parse_or_none::<Upgradeability>(&self.upgradeability, Upgradeability::None)?;
        let presale_type = parse_or_none::<PresaleType>(&self.presale_type, PresaleType::None)?;

        let max_supply = if standard_functions.contains(&StandardFunction::Cap) {
            let raw = self
                .max_supply
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or(ConfigValidationError::MissingField("maxSupply"))?;
            let max_supply = TokenAmount::parse("maxSupply", raw, decimals)?;
            if max_supply.base_units() <= initial_supply.base_units() {
                return Err(ConfigValidationError::CapNotAboveInitialSupply {
                    initial_supply: initial_supply.entered().to_string(),
                    max_supply: max_supply.entered().to_string(),
                });
            }
            Some(max_supply)
        } else {
            None
        };

        let anti_whale = if security_functions.contains(&SecurityFunction::AntiWhale) {
            let holder = optional_required(&self.max_holder_limit, "maxHolderLimit")?;
            let tx = optional_required(&self.max_transaction_amount, "maxTransactionAmount")?;
            Some(AntiWhaleLimits {
                max_holder_limit: TokenAmount::parse("maxHolderLimit", holder, decimals)?,
                max_transaction_amount: TokenAmount::parse("maxTransactionAmount", tx, decimals)?,
            })
        } else {
            None
        };

        let trading_cooldown_secs = if security_functions.contains(&SecurityFunction::AntiBot) {
            match self.trading_cooldown.as_deref().map(str::trim) {
                None | Some("") => Some(DEFAULT_TRADING_COOLDOWN_SECS),
                Some(raw) => Some(raw.parse::<u64>().map_err(|e| {
                    ConfigValidationError::InvalidNumber {
                        field: "tradingCooldown",
                        value: raw.to_string(),
                        reason: e.to_string(),
                    }
                })?),
            }
        } else {
            None
        };

        Ok(FeatureConfig {
            network,
            token_name,
            token_symbol,
            contract_name,
            decimals,
            initial_supply,
            max_supply,
            access_control,
            access_manager,
            standard_functions,
            security_functions,
            tax_functions,
            upgradeability,
            presale_type,
            anti_whale,
            trading_cooldown_secs,
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ConfigValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ConfigValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

fn optional_required<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, ConfigValidationError> {
    required(value.as_deref().unwrap_or(""), field)
}

fn parse_authority(raw: &str) -> Result<Address, ConfigValidationError> {
    let invalid = |reason: String| ConfigValidationError::InvalidAddress {
        field: "accessManager",
        value: raw.to_string(),
        reason,
    };
    let address: Address = raw.parse().map_err(|e| invalid(format!("{e}")))?;
    if address.is_zero() {
        return Err(invalid("zero address cannot govern the token".into()));
    }
    Ok(address)
}

fn parse_set<T: WizardOption + Ord>(values: &[String]) -> Result<BTreeSet<T>, ConfigValidationError> {
    values.iter().map(|v| T::parse(v)).collect()
}

fn parse_or_none<T: WizardOption>(value: &str, none: T) -> Result<T, ConfigValidationError> {
    if value.trim().is_empty() {
        Ok(none)
    } else {
        T::parse(value)
    }
}

/// Reduce a token name to a contract identifier: drop every non-alphanumeric
/// character, then any leading digits, and upper-case the rest.
pub fn contract_identifier(token_name: &str) -> Option<String> {
    let alphanumeric = NON_ALPHANUMERIC.replace_all(token_name, "");
    let reduced = LEADING_DIGITS.replace(&alphanumeric, "");
    if reduced.is_empty() {
        None
    } else {
        Some(reduced.to_ascii_uppercase())
    }
}

// ---------------------------------------------------------------------------
// FeatureConfig
// ---------------------------------------------------------------------------

/// Validated, immutable description of the token to synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureConfig {
    network: Network,
    token_name: String,
    token_symbol: String,
    contract_name: String,
    decimals: u8,
    initial_supply: TokenAmount,
    max_supply: Option<TokenAmount>,
    access_control: AccessControl,
    access_manager: Option<Address>,
    standard_functions: BTreeSet<StandardFunction>,
    security_functions: BTreeSet<SecurityFunction>,
    tax_functions: BTreeSet<TaxFunction>,
    upgradeability: Upgradeability,
    presale_type: PresaleType,
    anti_whale: Option<AntiWhaleLimits>,
    trading_cooldown_secs: Option<u64>,
}

impl FeatureConfig {
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn token_symbol(&self) -> &str {
        &self.token_symbol
    }

    /// The contract identifier derived from the token name.
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn initial_supply(&self) -> &TokenAmount {
        &self.initial_supply
    }

    /// Present exactly when `cap` is selected.
    pub fn max_supply(&self) -> Option<&TokenAmount> {
        self.max_supply.as_ref()
    }

    pub fn access_control(&self) -> AccessControl {
        self.access_control
    }

    /// Authority passed to `AccessManaged`; set exactly when access control
    /// is [`AccessControl::Manager`].
    pub fn access_manager(&self) -> Option<Address> {
        self.access_manager
    }

    pub fn standard_functions(&self) -> &BTreeSet<StandardFunction> {
        &self.standard_functions
    }

    pub fn security_functions(&self) -> &BTreeSet<SecurityFunction> {
        &self.security_functions
    }

    pub fn tax_functions(&self) -> &BTreeSet<TaxFunction> {
        &self.tax_functions
    }

    pub fn upgradeability(&self) -> Upgradeability {
        self.upgradeability
    }

    pub fn presale_type(&self) -> PresaleType {
        self.presale_type
    }

    /// Present exactly when `antiwhale` is selected.
    pub fn anti_whale(&self) -> Option<&AntiWhaleLimits> {
        self.anti_whale.as_ref()
    }

    /// Present exactly when `antibot` is selected.
    pub fn trading_cooldown_secs(&self) -> Option<u64> {
        self.trading_cooldown_secs
    }

    pub fn has(&self, function: StandardFunction) -> bool {
        self.standard_functions.contains(&function)
    }

    pub fn has_security(&self, function: SecurityFunction) -> bool {
        self.security_functions.contains(&function)
    }

    pub fn has_any_security(&self) -> bool {
        !self.security_functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> FeatureConfigDraft {
        FeatureConfigDraft {
            network: "sepolia".into(),
            token_name: "My Token".into(),
            token_symbol: "MTK".into(),
            initial_supply: "1000000".into(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_draft_validates_with_defaults() {
        let config = draft().validate().unwrap();
        assert_eq!(config.network(), Network::Sepolia);
        assert_eq!(config.decimals(), 18);
        assert_eq!(config.access_control(), AccessControl::None);
        assert_eq!(config.upgradeability(), Upgradeability::None);
        assert_eq!(config.presale_type(), PresaleType::None);
        assert!(config.standard_functions().is_empty());
        assert!(config.max_supply().is_none());
    }

    #[test]
    fn contract_identifier_strips_and_uppercases() {
        assert_eq!(contract_identifier("My Token!").as_deref(), Some("MYTOKEN"));
        assert_eq!(contract_identifier("42 Moon-Coin").as_deref(), Some("MOONCOIN"));
        assert_eq!(contract_identifier("1234"), None);
        assert_eq!(contract_identifier("$$$"), None);
    }

    #[test]
    fn name_without_identifier_is_rejected() {
        let mut d = draft();
        d.token_name = "2024".into();
        assert!(matches!(
            d.validate(),
            Err(ConfigValidationError::InvalidContractName(_))
        ));
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut d = draft();
        d.token_symbol = "  ".into();
        assert_eq!(d.validate(), Err(ConfigValidationError::MissingField("tokenSymbol")));

        let mut d = draft();
        d.initial_supply.clear();
        assert_eq!(d.validate(), Err(ConfigValidationError::MissingField("initialSupply")));

        let mut d = draft();
        d.network.clear();
        assert_eq!(d.validate(), Err(ConfigValidationError::MissingField("network")));
    }

    #[test]
    fn initial_supply_is_scaled_by_decimals() {
        let mut d = draft();
        d.decimals = "6".into();
        d.initial_supply = "2.5".into();
        let config = d.validate().unwrap();
        assert_eq!(config.initial_supply().base_units(), U256::from(2_500_000u64));
        assert_eq!(config.initial_supply().entered(), "2.5");
    }

    #[test]
    fn malformed_quantities_are_rejected() {
        for bad in ["-5", "1e18", "abc", "1.", ".5"] {
            let mut d = draft();
            d.initial_supply = bad.into();
            assert!(
                matches!(d.validate(), Err(ConfigValidationError::InvalidNumber { .. })),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn decimals_must_fit_u8() {
        let mut d = draft();
        d.decimals = "300".into();
        assert!(matches!(
            d.validate(),
            Err(ConfigValidationError::InvalidNumber { field: "decimals", .. })
        ));
    }

    #[test]
    fn cap_requires_max_supply_above_initial() {
        let mut d = draft();
        d.standard_functions = vec!["cap".into()];
        assert_eq!(d.validate(), Err(ConfigValidationError::MissingField("maxSupply")));

        d.max_supply = Some("1000000".into());
        assert!(matches!(
            d.validate(),
            Err(ConfigValidationError::CapNotAboveInitialSupply { .. })
        ));

        d.max_supply = Some("999999".into());
        assert!(d.validate().is_err());

        d.max_supply = Some("2000000".into());
        let config = d.validate().unwrap();
        assert!(config.has(StandardFunction::Cap));
        assert!(config.max_supply().is_some());
    }

    #[test]
    fn max_supply_ignored_without_cap() {
        let mut d = draft();
        d.max_supply = Some("1".into());
        assert!(d.validate().unwrap().max_supply().is_none());
    }

    #[test]
    fn antiwhale_requires_both_limits() {
        let mut d = draft();
        d.security_functions = vec!["antiwhale".into()];
        d.max_holder_limit = Some("10000".into());
        assert_eq!(
            d.validate(),
            Err(ConfigValidationError::MissingField("maxTransactionAmount"))
        );

        d.max_transaction_amount = Some("500".into());
        let config = d.validate().unwrap();
        let limits = config.anti_whale().unwrap();
        assert_eq!(limits.max_holder_limit.entered(), "10000");
        assert_eq!(limits.max_transaction_amount.entered(), "500");
    }

    #[test]
    fn antibot_defaults_cooldown() {
        let mut d = draft();
        d.security_functions = vec!["antibot".into()];
        let config = d.validate().unwrap();
        assert_eq!(config.trading_cooldown_secs(), Some(DEFAULT_TRADING_COOLDOWN_SECS));

        d.trading_cooldown = Some("120".into());
        assert_eq!(d.validate().unwrap().trading_cooldown_secs(), Some(120));

        d.trading_cooldown = Some("soon".into());
        assert!(d.validate().is_err());
    }

    #[test]
    fn unknown_options_are_rejected() {
        let mut d = draft();
        d.access_control = "dao".into();
        assert_eq!(
            d.validate(),
            Err(ConfigValidationError::UnknownOption {
                field: "accessControl",
                value: "dao".into()
            })
        );

        let mut d = draft();
        d.standard_functions = vec!["mint".into(), "airdrop".into()];
        assert!(d.validate().is_err());

        let mut d = draft();
        d.network = "solana".into();
        assert!(d.validate().is_err());
    }

    #[test]
    fn manager_access_needs_authority_address() {
        let mut d = draft();
        d.access_control = "manager".into();
        assert_eq!(
            d.validate(),
            Err(ConfigValidationError::MissingField("accessManager"))
        );

        d.access_manager = Some("not-an-address".into());
        assert!(matches!(
            d.validate(),
            Err(ConfigValidationError::InvalidAddress {
                field: "accessManager",
                ..
            })
        ));

        d.access_manager = Some("0x0000000000000000000000000000000000000000".into());
        assert!(matches!(
            d.validate(),
            Err(ConfigValidationError::InvalidAddress { .. })
        ));

        d.access_manager = Some(" 0x00000000000000000000000000000000000000Aa ".into());
        let config = d.validate().unwrap();
        assert_eq!(
            config.access_manager(),
            Some(Address::with_last_byte(0xaa))
        );
    }

    #[test]
    fn authority_is_ignored_without_manager_access() {
        let mut d = draft();
        d.access_control = "ownable".into();
        d.access_manager = Some("0x00000000000000000000000000000000000000aa".into());
        assert_eq!(d.validate().unwrap().access_manager(), None);
    }

    #[test]
    fn duplicate_selections_collapse() {
        let mut d = draft();
        d.standard_functions = vec!["burn".into(), "mint".into(), "burn".into()];
        let config = d.validate().unwrap();
        let ordered: Vec<_> = config.standard_functions().iter().copied().collect();
        assert_eq!(ordered, vec![StandardFunction::Mint, StandardFunction::Burn]);
    }

    #[test]
    fn draft_parses_wizard_json() {
        let json = r#"{
            "network": "bsc-testnet",
            "tokenName": "Rocket",
            "tokenSymbol": "RKT",
            "decimals": "9",
            "initialSupply": "500",
            "accessControl": "roles",
            "standardFunctions": ["mint", "pause"],
            "securityFunctions": ["blacklist"],
            "taxFunctions": ["treasuryFee", "autoLP"],
            "upgradeability": "uups",
            "presaleType": "ido"
        }"#;
        let d: FeatureConfigDraft = serde_json::from_str(json).unwrap();
        let config = d.validate().unwrap();
        assert_eq!(config.network(), Network::BscTestnet);
        assert_eq!(config.access_control(), AccessControl::Roles);
        assert!(config.tax_functions().contains(&TaxFunction::AutoLp));
        assert_eq!(config.upgradeability(), Upgradeability::Uups);
        assert_eq!(config.presale_type(), PresaleType::Ido);
    }
}
