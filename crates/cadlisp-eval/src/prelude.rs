/// Definitions evaluated in the global environment when a session starts.
pub const PRELUDE: &str = r#"
(def! T true)

(def! *host-language* "rust")

(def! not (fn* (a) (if a nil true)))

;; (load-file "script.lsp") evaluates every form in the file, yielding nil.
(def! load-file
  (fn* (f)
    (eval (read-string (str "(do " (slurp f) "\nnil)")))))
"#;
