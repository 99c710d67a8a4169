//! Demonstrate error handling for invalid rule files.

use rewrite_conf::{Compiler, CompilerConfig, Diagnostic};

fn main() {
    // Unterminated quoted string
    match rewrite_conf::compile("domain a.com {\n  set $cookie \"unclosed\n}\n") {
        Ok(_) => println!("Compiled OK (unexpected)"),
        Err(rewrite_conf::Error::Lex(e)) => {
            println!("Lex error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!(
                "  Location: line {}, column {}",
                e.diagnostic.line, e.diagnostic.column
            );
        }
        Err(rewrite_conf::Error::Parse(e)) => {
            println!("Parse error: {e}");
        }
    }

    println!();

    // Location outside of any domain
    match rewrite_conf::compile("location /api {\n  proxy_pass http://127.0.0.1;\n}\n") {
        Ok(_) => println!("Compiled OK (unexpected)"),
        Err(rewrite_conf::Error::Lex(e)) => {
            println!("Lex error: {e}");
        }
        Err(rewrite_conf::Error::Parse(e)) => {
            println!("Parse error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Class: {:?}", e.kind.class());
        }
    }

    println!();

    // Collect diagnostics instead of logging them
    let mut compiler = Compiler::new(CompilerConfig::new().with_source_name("rules.conf"))
        .with_reporter(Vec::<Diagnostic>::new());
    let _ = compiler.compile("domain a.com {\n  location ~ {\n  }\n}\n");
    for diagnostic in compiler.reporter() {
        print!("{diagnostic}");
    }
}
