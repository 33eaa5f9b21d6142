//! Contract source synthesis.
//!
//! [`synthesize`] is a pure function of a validated [`FeatureConfig`]: the
//! same config always yields byte-identical source text.

mod builder;
mod rules;

pub use builder::ContractBuilder;

use tracing::debug;

use crate::feature_config::FeatureConfig;

/// Run every generation rule against `config` and return the populated
/// builder, before rendering.
pub fn build(config: &FeatureConfig) -> ContractBuilder {
    let mut builder = ContractBuilder::new(config.contract_name());
    for rule in rules::RULES {
        rule(config, &mut builder);
    }
    builder
}

/// Generate the contract source for `config`.
pub fn synthesize(config: &FeatureConfig) -> String {
    let builder = build(config);
    debug!(
        contract = %builder.contract_name(),
        imports = builder.imports().len(),
        bases = builder.inheritance().len(),
        functions = builder.functions().len(),
        "synthesized contract source"
    );
    builder.render()
}
