use std::fmt::Write as _;

const LICENSE: &str = "MIT";
const PRAGMA: &str = "^0.8.20";
const INDENT: &str = "    ";

/// Structured contract source under construction.
///
/// Rules append to ordered sections; nothing is turned into text until
/// [`render`](Self::render), so rule order only decides order *within* a
/// section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractBuilder {
    contract_name: String,
    imports: Vec<String>,
    inheritance: Vec<String>,
    constructor_params: Vec<String>,
    base_initializers: Vec<String>,
    constructor_body: Vec<String>,
    state: Vec<String>,
    functions: Vec<String>,
}

impl ContractBuilder {
    pub fn new(contract_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            ..Default::default()
        }
    }

    /// Add an import path. Repeated paths are ignored.
    pub fn import(&mut self, path: &str) -> &mut Self {
        if !self.imports.iter().any(|p| p == path) {
            self.imports.push(path.to_string());
        }
        self
    }

    /// Add a base contract. Repeated entries are ignored.
    pub fn inherit(&mut self, base: &str) -> &mut Self {
        if !self.inheritance.iter().any(|b| b == base) {
            self.inheritance.push(base.to_string());
        }
        self
    }

    pub fn constructor_param(&mut self, param: impl Into<String>) -> &mut Self {
        self.constructor_params.push(param.into());
        self
    }

    /// Add a base-constructor invocation such as `ERC20(name_, symbol_)`.
    pub fn base_initializer(&mut self, call: impl Into<String>) -> &mut Self {
        self.base_initializers.push(call.into());
        self
    }

    /// Add a statement to the constructor body (without trailing newline).
    pub fn constructor_statement(&mut self, statement: impl Into<String>) -> &mut Self {
        self.constructor_body.push(statement.into());
        self
    }

    /// Add a block of state declarations (variables, constants, events).
    pub fn state_block(&mut self, block: impl Into<String>) -> &mut Self {
        self.state.push(block.into());
        self
    }

    /// Add a function block. Blocks are written unindented; rendering
    /// places them inside the contract body.
    pub fn function(&mut self, block: impl Into<String>) -> &mut Self {
        self.functions.push(block.into());
        self
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn inheritance(&self) -> &[String] {
        &self.inheritance
    }

    pub fn base_initializers(&self) -> &[String] {
        &self.base_initializers
    }

    pub fn constructor_body(&self) -> &[String] {
        &self.constructor_body
    }

    pub fn state_blocks(&self) -> &[String] {
        &self.state
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Render the final source text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "// SPDX-License-Identifier: {LICENSE}");
        let _ = writeln!(out, "pragma solidity {PRAGMA};");
        out.push('\n');
        for path in &self.imports {
            let _ = writeln!(out, "import \"{path}\";");
        }
        out.push('\n');

        let _ = write!(out, "contract {}", self.contract_name);
        if !self.inheritance.is_empty() {
            let _ = write!(out, " is {}", self.inheritance.join(", "));
        }
        out.push_str(" {\n");

        let mut sections: Vec<String> = self.state.clone();
        sections.push(self.render_constructor());
        sections.extend(self.functions.iter().cloned());

        let body: Vec<String> = sections.iter().map(|s| indent(s)).collect();
        out.push_str(&body.join("\n\n"));
        out.push_str("\n}\n");
        out
    }

    fn render_constructor(&self) -> String {
        let mut ctor = String::from("constructor(");
        if !self.constructor_params.is_empty() {
            ctor.push('\n');
            let params: Vec<String> = self
                .constructor_params
                .iter()
                .map(|p| format!("{INDENT}{p}"))
                .collect();
            ctor.push_str(&params.join(",\n"));
            ctor.push('\n');
        }
        ctor.push(')');
        for call in &self.base_initializers {
            ctor.push(' ');
            ctor.push_str(call);
        }
        ctor.push_str(" {\n");
        for statement in &self.constructor_body {
            let _ = writeln!(ctor, "{INDENT}{statement}");
        }
        ctor.push('}');
        ctor
    }
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{INDENT}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
