//! Generation rules. Each rule reads the config and appends to the builder;
//! none of them inspects what another rule produced.

use crate::feature_config::{AccessControl, FeatureConfig, SecurityFunction, StandardFunction};

use super::builder::ContractBuilder;

pub(crate) type Rule = fn(&FeatureConfig, &mut ContractBuilder);

const ERC20_IMPORT: &str = "@openzeppelin/contracts/token/ERC20/ERC20.sol";
const OWNABLE_IMPORT: &str = "@openzeppelin/contracts/access/Ownable.sol";
const ACCESS_CONTROL_IMPORT: &str = "@openzeppelin/contracts/access/AccessControl.sol";
const ACCESS_MANAGED_IMPORT: &str = "@openzeppelin/contracts/access/manager/AccessManaged.sol";
const BURNABLE_IMPORT: &str = "@openzeppelin/contracts/token/ERC20/extensions/ERC20Burnable.sol";
const PAUSABLE_IMPORT: &str = "@openzeppelin/contracts/utils/Pausable.sol";
const CAPPED_IMPORT: &str = "@openzeppelin/contracts/token/ERC20/extensions/ERC20Capped.sol";
const CONTEXT_IMPORT: &str = "@openzeppelin/contracts/utils/Context.sol";

const MINTER_ROLE: &str = "MINTER_ROLE";
const PAUSER_ROLE: &str = "PAUSER_ROLE";
const DEFAULT_ADMIN_ROLE: &str = "DEFAULT_ADMIN_ROLE";

/// Rules in application order.
pub(crate) const RULES: &[Rule] = &[
    base_token,
    access_control_mixin,
    standard_mixins,
    security_import,
    role_grants,
    decimals_override,
    privileged_functions,
    security_features,
    balance_hook,
];

/// Modifier guarding a privileged function, or `None` when the contract has
/// no access control to guard with.
fn guard(access: AccessControl, role: &str) -> Option<String> {
    match access {
        AccessControl::None => None,
        AccessControl::Ownable => Some("onlyOwner".into()),
        AccessControl::Roles => Some(format!("onlyRole({role})")),
        AccessControl::Manager => Some("restricted".into()),
    }
}

fn role_constant(role: &str) -> String {
    format!("bytes32 public constant {role} = keccak256(\"{role}\");")
}

fn base_token(_config: &FeatureConfig, b: &mut ContractBuilder) {
    b.import(ERC20_IMPORT)
        .inherit("ERC20")
        .constructor_param("string memory name_")
        .constructor_param("string memory symbol_")
        .constructor_param("uint256 initialSupply")
        // decimals are passed for ABI compatibility; the value is baked in below
        .constructor_param("uint8")
        .base_initializer("ERC20(name_, symbol_)")
        .constructor_statement("_mint(msg.sender, initialSupply);");
}

fn access_control_mixin(config: &FeatureConfig, b: &mut ContractBuilder) {
    match config.access_control() {
        AccessControl::None => {}
        AccessControl::Ownable => {
            b.import(OWNABLE_IMPORT)
                .inherit("Ownable")
                .base_initializer("Ownable(msg.sender)");
        }
        AccessControl::Roles => {
            b.import(ACCESS_CONTROL_IMPORT).inherit("AccessControl");
        }
        AccessControl::Manager => {
            // restricted calls consult the deployed AccessManager, never the deployer
            b.import(ACCESS_MANAGED_IMPORT)
                .inherit("AccessManaged")
                .constructor_param("address initialAuthority")
                .base_initializer("AccessManaged(initialAuthority)");
        }
    }
}

fn standard_mixins(config: &FeatureConfig, b: &mut ContractBuilder) {
    if config.has(StandardFunction::Burn) {
        b.import(BURNABLE_IMPORT).inherit("ERC20Burnable");
    }
    if config.has(StandardFunction::Pause) {
        b.import(PAUSABLE_IMPORT).inherit("Pausable");
    }
    if let Some(max_supply) = config.max_supply() {
        b.import(CAPPED_IMPORT)
            .inherit("ERC20Capped")
            .base_initializer(format!("ERC20Capped({})", max_supply.base_units()));
    }
}

fn security_import(config: &FeatureConfig, b: &mut ContractBuilder) {
    if config.has_any_security() {
        b.import(CONTEXT_IMPORT);
    }
}

fn role_grants(config: &FeatureConfig, b: &mut ContractBuilder) {
    if config.access_control() != AccessControl::Roles {
        return;
    }
    if config.has(StandardFunction::Mint) {
        b.state_block(role_constant(MINTER_ROLE));
    }
    if config.has(StandardFunction::Pause) {
        b.state_block(role_constant(PAUSER_ROLE));
    }

    b.constructor_statement(format!("_grantRole({DEFAULT_ADMIN_ROLE}, msg.sender);"));
    if config.has(StandardFunction::Mint) {
        b.constructor_statement(format!("_grantRole({MINTER_ROLE}, msg.sender);"));
    }
    if config.has(StandardFunction::Pause) {
        b.constructor_statement(format!("_grantRole({PAUSER_ROLE}, msg.sender);"));
    }
}

fn decimals_override(config: &FeatureConfig, b: &mut ContractBuilder) {
    if config.decimals() == 18 {
        return;
    }
    b.function(format!(
        "function decimals() public pure override returns (uint8) {{\n    return {};\n}}",
        config.decimals()
    ));
}

fn privileged_functions(config: &FeatureConfig, b: &mut ContractBuilder) {
    let access = config.access_control();

    if config.has(StandardFunction::Mint) {
        if let Some(modifier) = guard(access, MINTER_ROLE) {
            b.function(format!(
                "function mint(address to, uint256 amount) public {modifier} {{\n    _mint(to, amount);\n}}"
            ));
        }
    }

    if config.has(StandardFunction::Pause) {
        if let Some(modifier) = guard(access, PAUSER_ROLE) {
            b.function(format!("function pause() public {modifier} {{\n    _pause();\n}}"));
            b.function(format!("function unpause() public {modifier} {{\n    _unpause();\n}}"));
        }
    }
}

fn security_features(config: &FeatureConfig, b: &mut ContractBuilder) {
    let admin = guard(config.access_control(), DEFAULT_ADMIN_ROLE);

    if let Some(limits) = config.anti_whale() {
        b.state_block(format!(
            "bool private constant ANTI_WHALE_ENABLED = true;\n\
             uint256 public maxTransactionAmount = {};\n\
             uint256 public maxHolderLimit = {};",
            limits.max_transaction_amount.base_units(),
            limits.max_holder_limit.base_units(),
        ));
        if let Some(modifier) = &admin {
            b.function(format!(
                "function setAntiWhaleLimits(uint256 newMaxTransactionAmount, uint256 newMaxHolderLimit) external {modifier} {{\n    \
                     maxTransactionAmount = newMaxTransactionAmount;\n    \
                     maxHolderLimit = newMaxHolderLimit;\n\
                 }}"
            ));
        }
    }

    if let Some(cooldown) = config.trading_cooldown_secs() {
        b.state_block(format!(
            "bool private constant ANTI_BOT_ENABLED = true;\n\
             uint256 public tradingCooldown = {cooldown};\n\
             mapping(address => uint256) private _lastTradeTime;"
        ));
        if let Some(modifier) = &admin {
            b.function(format!(
                "function setTradingCooldown(uint256 newCooldown) external {modifier} {{\n    \
                     tradingCooldown = newCooldown;\n\
                 }}"
            ));
        }
    }

    if config.has_security(SecurityFunction::Blacklist) {
        b.state_block(
            "mapping(address => bool) private _blacklisted;\n\n\
             event BlacklistUpdated(address indexed account, bool blacklisted);",
        );
        if let Some(modifier) = &admin {
            b.function(format!(
                "function setBlacklisted(address account, bool blacklisted) external {modifier} {{\n    \
                     _blacklisted[account] = blacklisted;\n    \
                     emit BlacklistUpdated(account, blacklisted);\n\
                 }}"
            ));
        }
        b.function(
            "function isBlacklisted(address account) public view returns (bool) {\n    \
                 return _blacklisted[account];\n\
             }",
        );
    }

    if config.has_security(SecurityFunction::Allowlist) {
        b.state_block(
            "mapping(address => bool) private _allowlisted;\n\
             bool public allowlistEnabled = true;\n\n\
             event AllowlistUpdated(address indexed account, bool allowed);\n\
             event AllowlistStatusChanged(bool enabled);",
        );
        b.constructor_statement("_allowlisted[_msgSender()] = true;");
        if let Some(modifier) = &admin {
            b.function(format!(
                "function setAllowlisted(address account, bool allowed) external {modifier} {{\n    \
                     _allowlisted[account] = allowed;\n    \
                     emit AllowlistUpdated(account, allowed);\n\
                 }}"
            ));
            b.function(format!(
                "function setAllowlistEnabled(bool enabled) external {modifier} {{\n    \
                     allowlistEnabled = enabled;\n    \
                     emit AllowlistStatusChanged(enabled);\n\
                 }}"
            ));
        }
        b.function(
            "function isAllowlisted(address account) public view returns (bool) {\n    \
                 return _allowlisted[account];\n\
             }",
        );
    }
}

/// Emits at most one `_update` override: the combined guard hook when pause
/// or any security function is active, otherwise the capped pass-through.
fn balance_hook(config: &FeatureConfig, b: &mut ContractBuilder) {
    let capped = config.has(StandardFunction::Cap);
    let pausable = config.has(StandardFunction::Pause);
    let guarded = config.has_any_security();
    let overrides = if capped {
        "override(ERC20, ERC20Capped)"
    } else {
        "override"
    };
    let signature =
        format!("function _update(address from, address to, uint256 value) internal {overrides}");

    if !guarded && !pausable {
        if capped {
            b.function(format!("{signature} {{\n    super._update(from, to, value);\n}}"));
        }
        return;
    }

    let mut body = Vec::new();
    if guarded {
        body.extend([
            "if (from == address(0) && totalSupply() == 0) {".to_string(),
            "    super._update(from, to, value);".to_string(),
            "    return;".to_string(),
            "}".to_string(),
        ]);
    }
    if pausable {
        body.push("require(!paused(), \"Token transfers are paused\");".into());
    }

    if config.has_security(SecurityFunction::Blacklist) {
        body.push(
            "require(!_blacklisted[from] && !_blacklisted[to], \"Address is blacklisted\");".into(),
        );
    }
    if config.has_security(SecurityFunction::Allowlist) {
        body.push("if (allowlistEnabled) {".into());
        body.push(
            "    require(_allowlisted[from] || _allowlisted[to], \"Address is not allowlisted\");"
                .into(),
        );
        body.push("}".into());
    }

    let anti_whale = config.anti_whale().is_some();
    let anti_bot = config.trading_cooldown_secs().is_some();
    if anti_whale || anti_bot {
        body.push("if (from != address(0) && to != address(0)) {".into());
        if anti_whale {
            body.extend([
                "    if (ANTI_WHALE_ENABLED) {".to_string(),
                "        require(value <= maxTransactionAmount, \"Transfer exceeds max transaction amount\");".to_string(),
                "        require(balanceOf(to) + value <= maxHolderLimit, \"Recipient exceeds max holder limit\");".to_string(),
                "    }".to_string(),
            ]);
        }
        if anti_bot {
            body.extend([
                "    if (ANTI_BOT_ENABLED) {".to_string(),
                "        require(block.timestamp >= _lastTradeTime[from] + tradingCooldown, \"Trading cooldown active\");".to_string(),
                "        _lastTradeTime[from] = block.timestamp;".to_string(),
                "    }".to_string(),
            ]);
        }
        body.push("}".into());
    }

    body.push("super._update(from, to, value);".into());

    let body: Vec<String> = body.into_iter().map(|line| format!("    {line}")).collect();
    b.function(format!("{signature} {{\n{}\n}}", body.join("\n")));
}
