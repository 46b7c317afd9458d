use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use apispec::{ApiSpec, Param};

use crate::generate::SpecModule;

/// [`SpecModule`] backed by the `apispec` crate. specials tables are looked up in
/// `specials_dir`.
pub struct ApiUtil {
    specials_dir: PathBuf,
    spec: Option<ApiSpec>,
}

impl ApiUtil {
    pub fn new<P: Into<PathBuf>>(specials_dir: P) -> Self {
        Self {
            specials_dir: specials_dir.into(),
            spec: None,
        }
    }
}

impl SpecModule for ApiUtil {
    fn write_copyright(&self, w: &mut dyn io::Write) -> io::Result<()> {
        apispec::emit_copyright_c(w)
    }

    fn load_dispatch_table(&mut self, spec_path: &Path) -> anyhow::Result<HashSet<String>> {
        let spec = apispec::load_spec(spec_path)?;
        let table: HashSet<String> = spec
            .dispatched_functions()
            .into_iter()
            .map(str::to_string)
            .collect();
        log::debug!(
            "loaded {} dispatched functions from {}",
            table.len(),
            spec_path.display()
        );
        self.spec = Some(spec);
        Ok(table)
    }

    fn all_specials(&self, table: &str) -> anyhow::Result<Vec<String>> {
        apispec::load_specials(table, &self.specials_dir)
    }

    fn parameters(&self, func_name: &str) -> anyhow::Result<Vec<Param>> {
        let spec = self.spec.as_ref().context("spec is not loaded")?;
        Ok(spec.parameters(func_name)?.to_vec())
    }

    fn declaration_string(&self, params: &[Param]) -> String {
        apispec::make_declaration_string(params)
    }

    fn call_string(&self, params: &[Param]) -> String {
        apispec::make_call_string(params)
    }
}
