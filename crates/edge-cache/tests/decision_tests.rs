//! End-to-end decisions from configuration to rendered header.

use std::sync::Arc;
use std::thread;

use edge_cache::{DecisionEngine, EsiContext, ExclusionReason, Stage};
use edge_core::{CacheConfig, Method, PageInfo, RequestContext, ServerKind};

const CONFIG: &str = r#"
[ttl]
front_page = 600
feed = 0
not_found = 0
forbidden = 30
server_error = 0
public = 120

[exclusions]
uris = ["/cart", "/my-account$"]
categories = ["members"]
cookies = "woocommerce_items_in_cart"
user_agents = "(?i)bot"
"#;

fn engine() -> DecisionEngine {
    DecisionEngine::new(CacheConfig::from_toml_str(CONFIG).unwrap()).unwrap()
}

fn header_for(engine: &DecisionEngine, ctx: &RequestContext, esi: &EsiContext) -> String {
    let mut control = engine.begin();
    engine.output(ctx, esi, &mut control).value().to_string()
}

#[test]
fn test_public_get() {
    let ctx = RequestContext::get("/blog/hello-world/").with_header("User-Agent", "Mozilla/5.0");
    assert_eq!(header_for(&engine(), &ctx, &EsiContext::none()), "public,max-age=120");
}

#[test]
fn test_front_page_ttl() {
    let ctx = RequestContext::get("/").with_page(PageInfo {
        front_page: true,
        ..Default::default()
    });
    assert_eq!(header_for(&engine(), &ctx, &EsiContext::none()), "public,max-age=600");
}

#[test]
fn test_disabled_404_is_no_cache() {
    let engine = engine();
    let ctx = RequestContext::get("/nope").with_page(PageInfo {
        not_found: true,
        ..Default::default()
    });

    assert_eq!(
        engine.rules().evaluate(&ctx, engine.config()),
        Some(ExclusionReason::NotFoundDisabled)
    );
    assert_eq!(header_for(&engine, &ctx, &EsiContext::none()), "no-cache");
}

#[test]
fn test_forbidden_ttl() {
    let ctx = RequestContext::get("/private").with_error_code(403);
    assert_eq!(header_for(&engine(), &ctx, &EsiContext::none()), "public,max-age=30");
}

#[test]
fn test_server_error_zero_ttl_still_applies() {
    let ctx = RequestContext::get("/broken").with_error_code(503);
    assert_eq!(header_for(&engine(), &ctx, &EsiContext::none()), "public,max-age=0");
}

#[test]
fn test_uri_rules() {
    let engine = engine();
    let esi = EsiContext::none();
    assert_eq!(header_for(&engine, &RequestContext::get("/cart/"), &esi), "no-cache");
    assert_eq!(header_for(&engine, &RequestContext::get("/my-account"), &esi), "no-cache");
    assert_eq!(
        header_for(&engine, &RequestContext::get("/my-account/orders"), &esi),
        "public,max-age=120"
    );
}

#[test]
fn test_cookie_and_user_agent() {
    let engine = engine();
    let esi = EsiContext::none();

    let with_cart = RequestContext::get("/shop/").with_cookie("woocommerce_items_in_cart", "1");
    assert_eq!(header_for(&engine, &with_cart, &esi), "no-cache");

    let crawler = RequestContext::get("/shop/").with_header("user-agent", "AhrefsBot/7.0");
    assert_eq!(header_for(&engine, &crawler, &esi), "no-cache");
}

#[test]
fn test_post_is_never_cached() {
    let ctx = RequestContext::new(Method::Post, "/contact/");
    let engine = engine();
    let mut control = engine.begin();
    let stage = engine.finalize(&ctx, &EsiContext::none(), &mut control);
    assert_eq!(stage, Stage::Exclusion(ExclusionReason::NotGet(Method::Post)));
    assert!(!control.get_cacheable());
}

#[test]
fn test_esi_suffix_on_both_branches() {
    let engine = engine();
    let blocks = EsiContext::with_blocks();

    assert_eq!(
        header_for(&engine, &RequestContext::get("/"), &blocks),
        "public,max-age=120,esi=on"
    );
    assert_eq!(
        header_for(&engine, &RequestContext::get("/cart"), &blocks),
        "no-cache,esi=on"
    );
}

#[test]
fn test_no_esi_suffix_on_openlitespeed() {
    let mut config = CacheConfig::from_toml_str(CONFIG).unwrap();
    config.esi.server = ServerKind::OpenLiteSpeed;
    let engine = DecisionEngine::new(config).unwrap();

    assert_eq!(
        header_for(&engine, &RequestContext::get("/"), &EsiContext::with_blocks()),
        "public,max-age=120"
    );
}

#[test]
fn test_loggedin_esi_fragment() {
    let mut config = CacheConfig::from_toml_str(CONFIG).unwrap();
    config.esi.loggedin = true;
    let engine = DecisionEngine::new(config).unwrap().with_fn(|control, fragment| {
        if fragment == Some("admin-bar") {
            control.set_no_vary();
            control.set_custom_ttl(1800);
        }
    });

    assert_eq!(
        header_for(&engine, &RequestContext::get("/"), &EsiContext::fragment("admin-bar")),
        "shared,private,no-vary,max-age=1800"
    );
    assert_eq!(
        header_for(&engine, &RequestContext::get("/"), &EsiContext::none()),
        "shared,private,max-age=120"
    );
}

#[test]
fn test_mobile_variant_process() {
    let mut config = CacheConfig::from_toml_str(CONFIG).unwrap();
    config.mobile.enabled = true;
    config.mobile.vary_value = "ismobile".to_string();
    let engine = DecisionEngine::new(config).unwrap();
    let esi = EsiContext::none();

    assert_eq!(
        header_for(&engine, &RequestContext::get("/").with_host_mobile(), &esi),
        "public,max-age=120"
    );
    assert_eq!(header_for(&engine, &RequestContext::get("/"), &esi), "no-cache");
}

#[test]
fn test_state_does_not_leak_between_requests() {
    let engine = engine().with_fn(|control, fragment| {
        if fragment.is_some() {
            control.set_private();
            control.set_custom_ttl(5);
        }
    });
    let ctx = RequestContext::get("/");

    assert_eq!(
        header_for(&engine, &ctx, &EsiContext::fragment("widget")),
        "private,max-age=5"
    );
    assert_eq!(header_for(&engine, &ctx, &EsiContext::none()), "public,max-age=120");
}

#[test]
fn test_shared_engine_across_threads() {
    let engine = Arc::new(engine().with_fn(|control, _| control.set_no_vary()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let ctx = if i % 2 == 0 {
                    RequestContext::get(format!("/post/{}", i))
                } else {
                    RequestContext::get(format!("/cart/{}", i))
                };
                let mut control = engine.begin();
                let header = engine.output(&ctx, &EsiContext::none(), &mut control);
                (i, header.value().to_string())
            })
        })
        .collect();

    for handle in handles {
        let (i, value) = handle.join().unwrap();
        if i % 2 == 0 {
            assert_eq!(value, "public,no-vary,max-age=120");
        } else {
            assert_eq!(value, "no-cache");
        }
    }
}
