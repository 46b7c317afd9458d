// records of the chromium APIspec.txt format. one record per `name` line, everything up to the
// next `name` line belongs to it.

use std::collections::HashMap;

use anyhow::Context as _;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub r#type: String,
    /// number of elements when the param is a fixed size vector (`paramvec`), 0 otherwise.
    pub vec_size: usize,
}

#[derive(Debug, Default, Clone)]
pub struct Function {
    pub name: String,
    pub return_type: String,
    pub params: Vec<Param>,
    pub alias: Option<String>,
    pub props: Vec<String>,
    pub chromium: Vec<String>,
}

impl Function {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn has_chromium(&self, prop: &str) -> bool {
        self.chromium.iter().any(|it| it == prop)
    }

    /// whether the function gets an entry in the spu dispatch table.
    pub fn is_dispatched(&self) -> bool {
        !self.has_chromium("omit") && !self.has_chromium("stub") && self.alias.is_none()
    }
}

#[derive(Debug, Default)]
pub struct ApiSpec {
    functions: Vec<Function>,
    index: HashMap<String, usize>,
}

impl ApiSpec {
    /// a repeated name replaces the earlier record in place.
    pub(crate) fn push(&mut self, function: Function) {
        if let Some(&i) = self.index.get(&function.name) {
            log::warn!("function {} is defined more than once", function.name);
            self.functions[i] = function;
            return;
        }
        self.index
            .insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
    }

    /// functions in the order they appear in the spec file.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.index.get(name).map(|&i| &self.functions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn parameters(&self, name: &str) -> anyhow::Result<&[Param]> {
        self.get(name)
            .map(|function| function.params.as_slice())
            .with_context(|| format!("unknown function: {name}"))
    }

    /// names of all functions handled by the spu dispatch table, sorted.
    pub fn dispatched_functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .functions
            .iter()
            .filter(|function| function.is_dispatched())
            .map(|function| function.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}
