//! Compile a rule file and print what each host resolves to.

fn main() {
    let input = "\
set $local http://127.0.0.1:8000

http://api.example.com/ => $local/api/

domain example.com {
  proxy_set_header Host example.com;

  location /static {
    proxy_pass $local/static/;
  }

  location ~ ^/(ucenter|api)/ {
    proxy_pass $local;
  }
}
";

    let config = rewrite_conf::compile(input).expect("compile failed");

    for (host, domain) in &config {
        println!("Host: {host}");
        for directive in &domain.directives {
            println!("  {} {}", directive.directive, directive.arguments.join(" "));
        }
        for location in &domain.locations {
            let kind = if location.is_base_rule { " (base rule)" } else { "" };
            println!("  Location: {}{kind}", location.location.as_str());
            for directive in &location.directives {
                println!(
                    "    {} {}",
                    directive.directive,
                    directive.arguments.join(" ")
                );
            }
        }
    }

    let json = serde_json::to_string_pretty(&config).expect("serialize failed");
    println!("\nJSON:\n{json}");
}
