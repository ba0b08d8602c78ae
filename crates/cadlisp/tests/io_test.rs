mod common;

use cadlisp::{Interpreter, Value};

fn lisp_path(path: &std::path::Path) -> String {
    format!("{:?}", path.to_string_lossy())
}

#[test]
fn write_then_read_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = lisp_path(&dir.path().join("out.txt"));
    let interp = Interpreter::new();

    let write = format!(
        "(setq f (open {path} \"w\")) (write-line \"alpha\" f) (write-line \"beta\" f) (close f)"
    );
    interp.eval_str(&write).unwrap();

    let read = format!(
        "(setq f (open {path} \"r\") lines nil) \
         (while (setq ln (read-line f)) (setq lines (cons ln lines))) \
         (close f) (reverse lines)"
    );
    assert_eq!(interp.eval_str(&read).unwrap().to_string(), "(\"alpha\" \"beta\")");
}

#[test]
fn opening_a_missing_file_for_reading_is_nil() {
    let dir = tempfile::tempdir().unwrap();
    let path = lisp_path(&dir.path().join("absent.txt"));
    assert_eq!(common::eval(&format!("(open {path} \"r\")")), Value::Nil);
}

#[test]
fn filesystem_helpers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.lsp"), "(princ)").unwrap();
    std::fs::write(dir.path().join("b.dwg"), "xx").unwrap();
    let root = lisp_path(dir.path());
    let file = lisp_path(&dir.path().join("a.lsp"));

    let interp = Interpreter::new();
    assert_eq!(
        interp.eval_str(&format!("(vl-file-size {file})")).unwrap(),
        Value::Int(7)
    );
    assert_eq!(
        interp.eval_str(&format!("(vl-filename-base {file})")).unwrap(),
        Value::string("a")
    );
    assert_eq!(
        interp
            .eval_str(&format!("(vl-filename-extension {file})"))
            .unwrap(),
        Value::string(".lsp")
    );
    assert_eq!(
        interp
            .eval_str(&format!("(vl-directory-files {root} \"*.lsp\" 1)"))
            .unwrap()
            .to_string(),
        "(\"a.lsp\")"
    );
    assert!(interp
        .eval_str(&format!("(vl-file-directory-p {root})"))
        .unwrap()
        .is_truthy());
}

#[test]
fn load_file_defines_into_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("tools.lsp");
    std::fs::write(
        &script,
        "; drawing helpers\n(defun midpoint (p q) (mapcar (fn* (a b) (/ (+ a b) 2.0)) p q))\n",
    )
    .unwrap();

    let interp = Interpreter::new();
    let src = format!("(load-file {}) (midpoint '(0 0) '(4 2))", lisp_path(&script));
    assert_eq!(interp.eval_str(&src).unwrap().to_string(), "(2.0 1.0)");
}

#[test]
fn load_file_reports_missing_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new();
    let err = interp.load_file(dir.path().join("missing.lsp")).unwrap_err();
    assert!(err.to_string().contains("Cannot open"));
}
