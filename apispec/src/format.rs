use std::io;

use crate::spec::Param;

const COPYRIGHT_C: &str = "/* Copyright (c) 2001, Stanford University
 * All rights reserved.
 *
 * See the file LICENSE.txt for information on redistributing this software.
 */
";

pub fn emit_copyright_c<W: io::Write + ?Sized>(w: &mut W) -> io::Result<()> {
    w.write_all(COPYRIGHT_C.as_bytes())
}

/// c parameter declaration list, e.g. `GLuint index, GLfloat v[3]`. empty when there are no
/// params.
pub fn make_declaration_string(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| {
            if param.vec_size > 0 {
                format!("{} {}[{}]", param.r#type, param.name, param.vec_size)
            } else {
                format!("{} {}", param.r#type, param.name)
            }
        })
        .collect::<Vec<String>>()
        .join(", ")
}

/// c call argument list, e.g. `index, v`.
pub fn make_call_string(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| param.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ")
}

#[cfg(test)]
fn param(name: &str, r#type: &str, vec_size: usize) -> Param {
    Param {
        name: name.to_string(),
        r#type: r#type.to_string(),
        vec_size,
    }
}

#[test]
fn test_make_declaration_string() {
    assert_eq!(make_declaration_string(&[]), "");
    assert_eq!(
        make_declaration_string(&[param("target", "GLenum", 0), param("v", "GLfloat", 4)]),
        "GLenum target, GLfloat v[4]"
    );
}

#[test]
fn test_make_call_string() {
    assert_eq!(make_call_string(&[]), "");
    assert_eq!(
        make_call_string(&[
            param("target", "GLenum", 0),
            param("pname", "GLenum", 0),
            param("params", "const GLint *", 0),
        ]),
        "target, pname, params"
    );
}

#[test]
fn test_emit_copyright_c() {
    let mut out: Vec<u8> = Vec::new();
    emit_copyright_c(&mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("/* Copyright (c) 2001, Stanford University\n"));
    assert!(out.ends_with(" */\n"));
}
