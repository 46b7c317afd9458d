use std::fs;
use std::path::Path;

use anyhow::{Context as _, bail};

use crate::spec::*;

fn expect_token<'a>(tokens: &[&'a str], i: usize, what: &str) -> anyhow::Result<&'a str> {
    tokens
        .get(i)
        .copied()
        .with_context(|| format!("{} is missing {what}", tokens[0]))
}

fn to_strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|token| token.to_string()).collect()
}

fn parse_line_into(tokens: &[&str], function: &mut Function) -> anyhow::Result<()> {
    match tokens[0] {
        "return" => function.return_type = tokens[1..].join(" "),
        "param" => {
            let name = expect_token(tokens, 1, "name")?;
            if tokens.len() < 3 {
                bail!("param {name} is missing type");
            }
            function.params.push(Param {
                name: name.to_string(),
                r#type: tokens[2..].join(" "),
                vec_size: 0,
            });
        }
        "paramvec" => {
            let name = expect_token(tokens, 1, "name")?;
            let param = function
                .params
                .iter_mut()
                .find(|param| param.name == name)
                .with_context(|| format!("paramvec for undeclared param {name}"))?;
            param.vec_size = tokens.len() - 2;
        }
        "alias" => function.alias = Some(expect_token(tokens, 1, "value")?.to_string()),
        "props" => function.props.extend(to_strings(&tokens[1..])),
        "chromium" => function.chromium.extend(to_strings(&tokens[1..])),
        // known keys that nothing here consumes.
        "paramprop" | "paramlist" | "paramaction" | "paramset" | "category" | "offset"
        | "vectoralias" | "xform" | "chrelopcode" => {}
        other => log::warn!("invalid token {other:?} after function {}", function.name),
    }
    Ok(())
}

pub fn parse_spec(input: &str) -> anyhow::Result<ApiSpec> {
    let mut spec = ApiSpec::default();
    let mut cur_function: Option<Function> = None;

    for (i, line) in input.lines().enumerate() {
        if line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if tokens[0] == "name" {
            let name =
                expect_token(&tokens, 1, "value").with_context(|| format!("line {}", i + 1))?;
            if let Some(function) = cur_function.replace(Function::new(name)) {
                spec.push(function);
            }
            continue;
        }

        let Some(function) = cur_function.as_mut() else {
            bail!("line {}: {:?} before the first name", i + 1, tokens[0]);
        };
        parse_line_into(&tokens, function)
            .with_context(|| format!("line {}: could not parse {}", i + 1, function.name))?;
    }

    if let Some(function) = cur_function.take() {
        spec.push(function);
    }

    log::debug!("parsed {} functions", spec.functions().len());
    Ok(spec)
}

pub fn load_spec<P: AsRef<Path>>(path: P) -> anyhow::Result<ApiSpec> {
    let path = path.as_ref();
    let input =
        fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    parse_spec(&input).with_context(|| format!("could not parse {}", path.display()))
}

#[cfg(test)]
const SPEC: &str = r#"
# comment lines are skipped

name		Flush
return		void
category	1.0
chromium	pack packspu_flush

name		Color3fv
return		void
param		v		const GLfloat *
paramvec	v		0 0 0
category	1.0
chromium	pack

name		CopyTexImage2DEXT
alias		CopyTexImage2D
category	GL_EXT_copy_texture
props		setclient get

name		GetString
return		const GLubyte *
param		name	GLenum
paramprop	name	GL_VENDOR GL_RENDERER
category	1.0
chromium	extpack omit
"#;

#[test]
fn test_parse_spec() {
    let spec = parse_spec(SPEC).unwrap();
    let names: Vec<&str> = spec.functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        ["Flush", "Color3fv", "CopyTexImage2DEXT", "GetString"]
    );

    let flush = spec.get("Flush").unwrap();
    assert_eq!(flush.return_type, "void");
    assert_eq!(flush.chromium, ["pack", "packspu_flush"]);
    assert!(flush.params.is_empty());

    let color = spec.get("Color3fv").unwrap();
    assert_eq!(
        color.params,
        [Param {
            name: "v".to_string(),
            r#type: "const GLfloat *".to_string(),
            vec_size: 3,
        }]
    );

    let copy = spec.get("CopyTexImage2DEXT").unwrap();
    assert_eq!(copy.alias.as_deref(), Some("CopyTexImage2D"));
    assert_eq!(copy.props, ["setclient", "get"]);

    let get_string = spec.get("GetString").unwrap();
    assert_eq!(get_string.return_type, "const GLubyte *");
    assert_eq!(get_string.params.len(), 1);
    assert!(get_string.has_chromium("omit"));
}

#[test]
fn test_dispatched_functions() {
    let spec = parse_spec(SPEC).unwrap();
    // aliased and omitted functions are not dispatched; result is sorted.
    assert_eq!(spec.dispatched_functions(), ["Color3fv", "Flush"]);
}

#[test]
fn test_parameters_unknown_function() {
    let spec = parse_spec(SPEC).unwrap();
    assert!(spec.parameters("Finish").is_err());
    assert_eq!(spec.parameters("Color3fv").unwrap().len(), 1);
}

#[test]
fn test_parse_spec_errors() {
    assert!(parse_spec("return void\n").is_err());
    assert!(parse_spec("name Flush\nparam x\n").is_err());
    assert!(parse_spec("name Flush\nparamvec x 0 0\n").is_err());
    assert!(parse_spec("name\n").is_err());
}

#[test]
fn test_parse_spec_repeated_name_keeps_last_record() {
    let spec = parse_spec(
        "name Flush\nreturn void\nchromium omit\n\nname Finish\n\nname Flush\nparam x GLint\n",
    )
    .unwrap();
    let names: Vec<&str> = spec.functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Flush", "Finish"]);
    let flush = spec.get("Flush").unwrap();
    assert_eq!(flush.params.len(), 1);
    assert!(!flush.has_chromium("omit"));
    assert_eq!(spec.dispatched_functions(), ["Finish", "Flush"]);
}

#[test]
fn test_parse_spec_unknown_token_is_skipped() {
    let spec = parse_spec("name Flush\nfrobnicate yes\nreturn void\n").unwrap();
    assert_eq!(spec.get("Flush").unwrap().return_type, "void");
}

#[test]
fn test_load_spec() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("APIspec.txt");
    fs::write(&path, SPEC).unwrap();
    assert_eq!(load_spec(&path).unwrap().functions().len(), 4);

    let err = load_spec(dir.path().join("missing.txt")).unwrap_err();
    assert!(format!("{err}").contains("missing.txt"));
}
