#![allow(clippy::write_with_newline)]

use std::collections::HashSet;
use std::io;
use std::path::Path;

use anyhow::Context as _;
use apispec::Param;

pub const SPEC_FILE_NAME: &str = "APIspec.txt";
pub const DEFAULT_GENERATOR_NAME: &str = "packspu_flush.py";
pub const FLUSH_SPECIAL_TABLE: &str = "packspu_flush";

/// what the spec generator needs from the api spec module.
pub trait SpecModule {
    fn write_copyright(&self, w: &mut dyn io::Write) -> io::Result<()>;
    /// loads the spec file and returns names of all dispatched functions.
    fn load_dispatch_table(&mut self, spec_path: &Path) -> anyhow::Result<HashSet<String>>;
    /// names listed in the `<table>_special` table, in the order they should be generated.
    fn all_specials(&self, table: &str) -> anyhow::Result<Vec<String>>;
    fn parameters(&self, func_name: &str) -> anyhow::Result<Vec<Param>>;
    fn declaration_string(&self, params: &[Param]) -> String;
    fn call_string(&self, params: &[Param]) -> String;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SwapMode {
    /// branch on `pack_spu.swap` in the generated code.
    #[default]
    Runtime,
    /// always call the byte swapping packer.
    Always,
    /// never call the byte swapping packer.
    Never,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// shows up in the "DO NOT EDIT" banner.
    pub generator_name: String,
    pub special_table: String,
    pub swap: SwapMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator_name: DEFAULT_GENERATOR_NAME.to_string(),
            special_table: FLUSH_SPECIAL_TABLE.to_string(),
            swap: SwapMode::default(),
        }
    }
}

const INCLUDES: &str = "#include \"cr_glstate.h\"
#include \"cr_packfunctions.h\"
#include \"packspu.h\"
#include \"packspu_proto.h\"
";

fn emit_header<W: io::Write>(w: &mut W, config: &Config) -> io::Result<()> {
    write!(w, "\n")?;
    write!(
        w,
        "/* DO NOT EDIT - this file generated by {} script */\n\n",
        config.generator_name
    )?;
    write!(
        w,
        "/* These are otherwise ordinary functions which require that the buffer be\n"
    )?;
    write!(w, " * flushed immediately after packing the function.\n")?;
    write!(w, " */\n")?;
    w.write_all(INCLUDES.as_bytes())?;
    write!(w, "\n")
}

fn emit_wrapper<W: io::Write>(
    w: &mut W,
    func_name: &str,
    decl: &str,
    args: &str,
    swap: SwapMode,
) -> io::Result<()> {
    write!(w, "void PACKSPU_APIENTRY packspu_{func_name}( {decl} )\n")?;
    write!(w, "{{\n")?;
    write!(w, "\tGET_THREAD(thread);\n")?;
    match swap {
        SwapMode::Runtime => {
            write!(w, "\tif (pack_spu.swap)\n")?;
            write!(w, "\t{{\n")?;
            write!(w, "\t\tcrPack{func_name}SWAP( {args} );\n")?;
            write!(w, "\t}}\n")?;
            write!(w, "\telse\n")?;
            write!(w, "\t{{\n")?;
            write!(w, "\t\tcrPack{func_name}( {args} );\n")?;
            write!(w, "\t}}\n")?;
        }
        SwapMode::Always => write!(w, "\tcrPack{func_name}SWAP( {args} );\n")?,
        SwapMode::Never => write!(w, "\tcrPack{func_name}( {args} );\n")?,
    }
    write!(w, "\tpackspuFlush( (void *) thread );\n")?;
    write!(w, "}}\n\n")
}

/// writes pack spu wrappers that flush the pack buffer right after packing, one for every
/// special of `config.special_table` that is also in the dispatch table of
/// `<spec_dir>/APIspec.txt`.
pub fn generate_flush<W, S>(
    w: &mut W,
    spec_module: &mut S,
    spec_dir: &Path,
    config: &Config,
) -> anyhow::Result<()>
where
    W: io::Write,
    S: SpecModule + ?Sized,
{
    spec_module.write_copyright(w)?;
    emit_header(w, config)?;

    let dispatch_table = spec_module
        .load_dispatch_table(&spec_dir.join(SPEC_FILE_NAME))
        .context("could not load dispatch table")?;

    let specials = spec_module
        .all_specials(&config.special_table)
        .with_context(|| format!("could not load {} specials", config.special_table))?;

    let mut count = 0;
    for func_name in specials.iter() {
        if !dispatch_table.contains(func_name) {
            log::debug!("skipping {func_name}: not in the dispatch table");
            continue;
        }

        let params = spec_module
            .parameters(func_name)
            .with_context(|| format!("could not get params of {func_name}"))?;
        let decl = spec_module.declaration_string(&params);
        let args = spec_module.call_string(&params);
        emit_wrapper(w, func_name, &decl, &args, config.swap)?;
        count += 1;
    }

    log::info!(
        "generated {count} of {} {} wrappers",
        specials.len(),
        config.special_table
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSpecModule {
        specials: Vec<&'static str>,
        dispatched: Vec<&'static str>,
        params: Vec<(&'static str, Vec<Param>)>,
        loaded_from: Option<std::path::PathBuf>,
    }

    impl FakeSpecModule {
        fn new(specials: &[&'static str], dispatched: &[&'static str]) -> Self {
            Self {
                specials: specials.to_vec(),
                dispatched: dispatched.to_vec(),
                params: Vec::new(),
                loaded_from: None,
            }
        }

        fn with_params(mut self, func_name: &'static str, params: &[(&str, &str)]) -> Self {
            let params = params
                .iter()
                .map(|(name, r#type)| Param {
                    name: name.to_string(),
                    r#type: r#type.to_string(),
                    vec_size: 0,
                })
                .collect();
            self.params.push((func_name, params));
            self
        }
    }

    impl SpecModule for FakeSpecModule {
        fn write_copyright(&self, w: &mut dyn io::Write) -> io::Result<()> {
            write!(w, "/* copyright */\n")
        }

        fn load_dispatch_table(&mut self, spec_path: &Path) -> anyhow::Result<HashSet<String>> {
            self.loaded_from = Some(spec_path.to_path_buf());
            Ok(self.dispatched.iter().map(|it| it.to_string()).collect())
        }

        fn all_specials(&self, table: &str) -> anyhow::Result<Vec<String>> {
            assert_eq!(table, FLUSH_SPECIAL_TABLE);
            Ok(self.specials.iter().map(|it| it.to_string()).collect())
        }

        fn parameters(&self, func_name: &str) -> anyhow::Result<Vec<Param>> {
            Ok(self
                .params
                .iter()
                .find(|(name, _)| *name == func_name)
                .map(|(_, params)| params.clone())
                .unwrap_or_default())
        }

        fn declaration_string(&self, params: &[Param]) -> String {
            apispec::make_declaration_string(params)
        }

        fn call_string(&self, params: &[Param]) -> String {
            apispec::make_call_string(params)
        }
    }

    fn generate(spec_module: &mut FakeSpecModule, swap: SwapMode) -> String {
        let config = Config {
            swap,
            ..Config::default()
        };
        let mut out: Vec<u8> = Vec::new();
        generate_flush(&mut out, spec_module, Path::new("/spec"), &config).unwrap();
        String::from_utf8(out).unwrap()
    }

    const HEADER: &str = "/* copyright */

/* DO NOT EDIT - this file generated by packspu_flush.py script */

/* These are otherwise ordinary functions which require that the buffer be
 * flushed immediately after packing the function.
 */
#include \"cr_glstate.h\"
#include \"cr_packfunctions.h\"
#include \"packspu.h\"
#include \"packspu_proto.h\"

";

    #[test]
    fn test_flush_runtime_swap() {
        let mut spec_module = FakeSpecModule::new(&["Flush"], &["Flush", "Finish"]);
        let out = generate(&mut spec_module, SwapMode::Runtime);
        let want = format!(
            "{HEADER}void PACKSPU_APIENTRY packspu_Flush(  )
{{
\tGET_THREAD(thread);
\tif (pack_spu.swap)
\t{{
\t\tcrPackFlushSWAP(  );
\t}}
\telse
\t{{
\t\tcrPackFlush(  );
\t}}
\tpackspuFlush( (void *) thread );
}}

"
        );
        assert_eq!(out, want);
        assert_eq!(
            spec_module.loaded_from.as_deref(),
            Some(Path::new("/spec/APIspec.txt"))
        );
    }

    #[test]
    fn test_flush_never_swap() {
        let mut spec_module = FakeSpecModule::new(&["Flush"], &["Flush"]);
        let out = generate(&mut spec_module, SwapMode::Never);
        assert!(out.contains("\tcrPackFlush(  );\n\tpackspuFlush( (void *) thread );\n"));
        assert!(!out.contains("SWAP"));
        assert!(!out.contains("pack_spu.swap"));
    }

    #[test]
    fn test_flush_always_swap() {
        let mut spec_module = FakeSpecModule::new(&["Flush"], &["Flush"]);
        let out = generate(&mut spec_module, SwapMode::Always);
        assert!(out.contains("\tcrPackFlushSWAP(  );\n\tpackspuFlush( (void *) thread );\n"));
        assert!(!out.contains("crPackFlush(  )"));
    }

    #[test]
    fn test_params_are_formatted() {
        let mut spec_module =
            FakeSpecModule::new(&["ChromiumParameteriCR"], &["ChromiumParameteriCR"])
                .with_params("ChromiumParameteriCR", &[("target", "GLenum"), ("value", "GLint")]);
        let out = generate(&mut spec_module, SwapMode::Runtime);
        assert!(out.contains(
            "void PACKSPU_APIENTRY packspu_ChromiumParameteriCR( GLenum target, GLint value )\n"
        ));
        assert!(out.contains("\t\tcrPackChromiumParameteriCRSWAP( target, value );\n"));
        assert!(out.contains("\t\tcrPackChromiumParameteriCR( target, value );\n"));
    }

    #[test]
    fn test_order_and_filtering() {
        let mut spec_module = FakeSpecModule::new(
            &["Finish", "Flush", "NotAnEntryPoint", "Bitmap"],
            &["Bitmap", "Finish", "Flush"],
        );
        let out = generate(&mut spec_module, SwapMode::Runtime);

        assert!(!out.contains("NotAnEntryPoint"));

        let wrappers: Vec<&str> = out
            .lines()
            .filter_map(|line| line.strip_prefix("void PACKSPU_APIENTRY packspu_"))
            .collect();
        assert_eq!(wrappers, ["Finish(  )", "Flush(  )", "Bitmap(  )"]);
        // wrappers are separated by a blank line.
        assert_eq!(out.matches("}\n\nvoid PACKSPU_APIENTRY").count(), 2);
        assert!(out.ends_with("}\n\n"));
    }

    #[test]
    fn test_no_specials_emits_header_only() {
        let mut spec_module = FakeSpecModule::new(&[], &["Flush"]);
        assert_eq!(generate(&mut spec_module, SwapMode::Runtime), HEADER);
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut a = FakeSpecModule::new(&["Finish", "Flush"], &["Finish", "Flush"]);
        let mut b = FakeSpecModule::new(&["Finish", "Flush"], &["Flush", "Finish"]);
        assert_eq!(
            generate(&mut a, SwapMode::Runtime),
            generate(&mut b, SwapMode::Runtime)
        );
    }

    #[test]
    fn test_custom_generator_name() {
        let mut spec_module = FakeSpecModule::new(&[], &[]);
        let config = Config {
            generator_name: "packspu-flush".to_string(),
            ..Config::default()
        };
        let mut out: Vec<u8> = Vec::new();
        generate_flush(&mut out, &mut spec_module, Path::new("."), &config).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("/* DO NOT EDIT - this file generated by packspu-flush script */\n"));
    }

    #[test]
    fn test_dispatch_table_error_propagates() {
        struct Broken;

        impl SpecModule for Broken {
            fn write_copyright(&self, _: &mut dyn io::Write) -> io::Result<()> {
                Ok(())
            }
            fn load_dispatch_table(&mut self, spec_path: &Path) -> anyhow::Result<HashSet<String>> {
                anyhow::bail!("could not read {}", spec_path.display())
            }
            fn all_specials(&self, _: &str) -> anyhow::Result<Vec<String>> {
                unreachable!()
            }
            fn parameters(&self, _: &str) -> anyhow::Result<Vec<Param>> {
                unreachable!()
            }
            fn declaration_string(&self, _: &[Param]) -> String {
                unreachable!()
            }
            fn call_string(&self, _: &[Param]) -> String {
                unreachable!()
            }
        }

        let mut out: Vec<u8> = Vec::new();
        let err = generate_flush(&mut out, &mut Broken, Path::new("/nope"), &Config::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nope/APIspec.txt"));
    }
}
