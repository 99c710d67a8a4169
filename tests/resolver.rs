//! Scope inheritance, substitution, and flattening.

mod common;

use common::{resolved, scalar};
use rewrite_conf::{
    CompilerConfig, LocationPattern, ResolvedDirective, Resolver, Scope, Value, Variables, parse,
    substitute_str,
};

fn directive_names(directives: &[ResolvedDirective]) -> Vec<&str> {
    directives.iter().map(|d| d.directive.as_str()).collect()
}

// -----------------------------------------------------------
// Inheritance.
// -----------------------------------------------------------

#[test]
fn resolve_global_directives_reach_locations() {
    let config = resolved(
        "proxy_set_header X-From global\n\
         domain a.com {\n\
           location / { proxy_pass http://b; }\n\
         }",
    );
    let domain = &config["a.com"];
    assert_eq!(directive_names(&domain.directives), vec!["proxy_set_header"]);

    let location = &domain.locations[0];
    assert_eq!(
        directive_names(&location.directives),
        vec!["proxy_set_header", "proxy_pass"]
    );
}

#[test]
fn resolve_local_directive_replaces_inherited() {
    let config = resolved(
        "domain a.com {\n\
           proxy_pass http://domain;\n\
           echo hi;\n\
           location / { proxy_pass http://location; }\n\
         }",
    );
    let location = &config["a.com"].locations[0];
    assert_eq!(directive_names(&location.directives), vec!["echo", "proxy_pass"]);
    assert_eq!(location.directives[1].arguments, vec!["http://location"]);
}

#[test]
fn resolve_inherited_directive_sees_rebound_variable() {
    let config = resolved("set $a 1;\nfoo $a;\nd.com => { set $a 2; }");
    let domain = &config["d.com"];
    assert_eq!(domain.variables["$a"], scalar("2"));
    assert_eq!(domain.directives[0].directive, "foo");
    assert_eq!(domain.directives[0].arguments, vec!["2"]);
}

#[test]
fn resolve_inherited_directive_per_location_binding() {
    let config = resolved(
        "set $backend http://global\n\
         proxy_pass $backend;\n\
         domain a.com {\n\
           location /a { set $backend http://a; }\n\
           location /b { }\n\
         }",
    );
    let locations = &config["a.com"].locations;
    assert_eq!(locations[0].directives[0].arguments, vec!["http://a"]);
    assert_eq!(locations[1].directives[0].arguments, vec!["http://global"]);
}

#[test]
fn resolve_local_variable_wins() {
    let config = resolved(
        "set $env prod\n\
         domain a.com {\n\
           location /a { set $env dev; }\n\
           location /b { }\n\
         }",
    );
    let locations = &config["a.com"].locations;
    assert_eq!(locations[0].variables["$env"], scalar("dev"));
    assert_eq!(locations[1].variables["$env"], scalar("prod"));
    assert_eq!(config["a.com"].variables["$env"], scalar("prod"));
}

#[test]
fn resolve_siblings_are_isolated() {
    let config = resolved(
        "domain a.com {\n\
           location /a { set $only_a 1; echo a; }\n\
           location /b { set $only_b 2; }\n\
         }\n\
         domain b.com { set $only_b_com 3; }",
    );
    let a = &config["a.com"];
    assert!(!a.locations[1].variables.contains_key("$only_a"));
    assert!(a.locations[1].directives.is_empty());
    assert!(!a.locations[0].variables.contains_key("$only_b"));
    assert!(!a.variables.contains_key("$only_b_com"));
}

#[test]
fn resolve_list_values_survive() {
    let config = resolved("set $hosts a b c\ndomain x.com {}");
    assert_eq!(
        config["x.com"].variables["$hosts"],
        Value::List(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );
}

// -----------------------------------------------------------
// Substitution.
// -----------------------------------------------------------

#[test]
fn resolve_substitutes_directive_arguments() {
    let config = resolved(
        "set $upstream http://127.0.0.1:8000\n\
         domain a.com {\n\
           location /api { proxy_pass $upstream/api/; }\n\
         }",
    );
    assert_eq!(
        config["a.com"].locations[0].directives[0].arguments,
        vec!["http://127.0.0.1:8000/api/"]
    );
}

#[test]
fn resolve_longest_name_wins() {
    let config = resolved(
        "set $a short\n\
         set $ab long\n\
         domain x.com { echo $ab $a; }",
    );
    assert_eq!(
        config["x.com"].directives[0].arguments,
        vec!["long", "short"]
    );
}

#[test]
fn resolve_unknown_reference_is_kept() {
    let config = resolved("domain x.com { echo $missing; }");
    assert_eq!(config["x.com"].directives[0].arguments, vec!["$missing"]);
}

#[test]
fn resolve_substitutes_domain_names() {
    let config = resolved("set $root example.com\ndomain api.$root { }");
    assert!(config.contains_key("api.example.com"));
    assert_eq!(config["api.example.com"].domain, "api.example.com");
}

#[test]
fn resolve_substitutes_location_paths() {
    let config = resolved("set $prefix /v2\ndomain x.com { location $prefix/users { } }");
    assert_eq!(
        config["x.com"].locations[0].location,
        LocationPattern::Path("/v2/users".to_string())
    );
}

#[test]
fn resolve_regex_locations_are_not_substituted() {
    let config = resolved("set $x api\ndomain x.com { location ~ ^/$x { } }");
    let location = &config["x.com"].locations[0].location;
    assert!(location.is_regex());
    assert_eq!(location.as_str(), r"^\/$x");
}

#[test]
fn resolve_list_reference_joins_with_spaces() {
    let config = resolved("set $methods GET POST\ndomain x.com { allow $methods; }");
    assert_eq!(config["x.com"].directives[0].arguments, vec!["GET POST"]);
}

#[test]
fn substitute_str_is_public() {
    let mut bindings = Variables::new();
    bindings.insert("$host".to_string(), scalar("a.com"));
    assert_eq!(substitute_str("http://$host/", &bindings), "http://a.com/");
}

// -----------------------------------------------------------
// Base rules.
// -----------------------------------------------------------

#[test]
fn resolve_base_rule_at_top_level() {
    let config = resolved("http://api.hiproxy.org/ => http://hiproxy.org/api/");
    let domain = &config["api.hiproxy.org"];
    assert_eq!(domain.locations.len(), 1);
    let location = &domain.locations[0];
    assert!(location.is_base_rule);
    assert_eq!(location.location.as_str(), "/");
    assert_eq!(
        location.variables["proxy_pass"],
        scalar("http://hiproxy.org/api/")
    );
}

#[test]
fn resolve_base_rule_keeps_path() {
    let config = resolved("https://a.com/static/img => http://cdn/img");
    assert_eq!(config["a.com"].locations[0].location.as_str(), "/static/img");
}

#[test]
fn resolve_base_rule_without_path_maps_to_root() {
    let config = resolved("http://a.com => http://b/");
    assert_eq!(config["a.com"].locations[0].location.as_str(), "/");
}

#[test]
fn resolve_base_rule_uses_enclosing_variables() {
    let config = resolved(
        "domain a.com {\n\
           set $target http://backend:9000\n\
           http://b.com/ => $target/\n\
         }",
    );
    assert_eq!(
        config["b.com"].locations[0].variables["proxy_pass"],
        scalar("http://backend:9000/")
    );
}

#[test]
fn resolve_base_rule_merges_into_declared_domain() {
    let config = resolved(
        "domain a.com { location /x { } }\n\
         http://a.com/y => http://b/",
    );
    let domain = &config["a.com"];
    assert_eq!(domain.locations.len(), 2);
    assert!(!domain.locations[0].is_base_rule);
    assert!(domain.locations[1].is_base_rule);
}

#[test]
fn resolve_custom_passthrough_directive() {
    let unit = parse("http://a.com/ => http://b/").expect("parse");
    let config = Resolver::new(CompilerConfig::new().with_passthrough_directive("upstream"))
        .resolve(&unit);
    let variables = &config["a.com"].locations[0].variables;
    assert!(variables.contains_key("upstream"));
    assert!(!variables.contains_key("proxy_pass"));
}

// -----------------------------------------------------------
// Flattening.
// -----------------------------------------------------------

#[test]
fn resolve_multi_domain_copies() {
    let config = resolved("a.com b.com => { location ~ ^/api { } }");
    assert_eq!(config.len(), 2);
    let a = &config["a.com"].locations[0].location;
    let b = &config["b.com"].locations[0].location;
    assert_eq!(a, b);
    assert!(a.is_regex());
}

#[test]
fn resolve_repeated_domain_merges() {
    let config = resolved(
        "domain a.com { set $v first; echo one; location /1 { } }\n\
         domain a.com { set $v second; set $w w; echo two; rewrite x; location /2 { } }",
    );
    let domain = &config["a.com"];
    assert_eq!(domain.variables["$v"], scalar("first"));
    assert_eq!(domain.variables["$w"], scalar("w"));
    assert_eq!(directive_names(&domain.directives), vec!["echo", "rewrite"]);
    assert_eq!(domain.locations.len(), 2);
}

// -----------------------------------------------------------
// Scope API.
// -----------------------------------------------------------

#[test]
fn scope_lookup_walks_parents() {
    let mut global = Scope::root();
    global.declare("$g", &scalar("1"));
    let mut domain = Scope::child(&global);
    domain.declare("$d", &scalar("$g"));
    let location = Scope::child(&domain);

    assert_eq!(location.lookup("$g"), Some(&scalar("1")));
    assert_eq!(location.lookup("$d"), Some(&scalar("$g")));
    assert_eq!(location.lookup("$none"), None);
    assert!(location.variables().is_empty());

    let effective = location.effective_variables();
    assert_eq!(effective.len(), 2);
}
