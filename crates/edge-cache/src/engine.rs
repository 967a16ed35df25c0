//! The ordered cache decision pipeline.

use std::fmt;

use edge_core::{CacheConfig, RequestContext};

use crate::control::CacheControl;
use crate::esi::EsiContext;
use crate::exclusion::{ExclusionReason, ExclusionRules, RuleError};
use crate::headers::{format_value, CacheControlHeader};
use crate::ttl::resolve_ttl;

/// Third-party callback run at the start of every decision.
///
/// Hooks receive the ESI block id when the request is a fragment sub-request
/// and may change any flag on the control state.
pub trait ControlHook: Send + Sync {
    fn apply(&self, control: &mut CacheControl, fragment_id: Option<&str>);
}

impl<F> ControlHook for F
where
    F: Fn(&mut CacheControl, Option<&str>) + Send + Sync,
{
    fn apply(&self, control: &mut CacheControl, fragment_id: Option<&str>) {
        self(control, fragment_id)
    }
}

/// Where the pipeline stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// The state had already been finalized; nothing ran.
    AlreadyFinalized,
    /// A hook vetoed caching.
    Hooks,
    /// A configured exclusion matched.
    Exclusion(ExclusionReason),
    /// Admin or network-admin screen.
    Admin,
    /// Global no-cache override.
    NoCacheOverride,
    /// Password protected post.
    PasswordProtected,
    /// Mobile handling vetoed caching.
    Mobile,
    /// Every stage passed.
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyFinalized => write!(f, "already finalized"),
            Self::Hooks => write!(f, "hooks"),
            Self::Exclusion(reason) => write!(f, "exclusion: {}", reason),
            Self::Admin => write!(f, "admin"),
            Self::NoCacheOverride => write!(f, "no-cache override"),
            Self::PasswordProtected => write!(f, "password protected"),
            Self::Mobile => write!(f, "mobile"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Decision engine shared by all requests of a process.
///
/// Holds only immutable configuration and hooks; every request brings its
/// own [`CacheControl`].
pub struct DecisionEngine {
    config: CacheConfig,
    rules: ExclusionRules,
    hooks: Vec<Box<dyn ControlHook>>,
}

impl fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("config", &self.config)
            .field("rules", &self.rules)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl DecisionEngine {
    /// Build an engine, validating the config and compiling exclusion rules
    /// up front.
    pub fn new(config: CacheConfig) -> Result<Self, RuleError> {
        config.validate()?;
        let rules = ExclusionRules::compile(&config)?;
        Ok(Self {
            config,
            rules,
            hooks: Vec::new(),
        })
    }

    /// Build an engine that ignores an invalid user agent pattern. The rest of
    /// the config must still be valid.
    pub fn new_lenient(config: CacheConfig) -> Result<Self, RuleError> {
        config.validate()?;
        let rules = ExclusionRules::compile_lenient(&config);
        Ok(Self {
            config,
            rules,
            hooks: Vec::new(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    /// Append a hook. Hooks run in registration order.
    pub fn register_hook(&mut self, hook: impl ControlHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Append a closure hook.
    pub fn register_fn<F>(&mut self, hook: F)
    where
        F: Fn(&mut CacheControl, Option<&str>) + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Builder form of [`register_hook`](Self::register_hook).
    pub fn with_hook(mut self, hook: impl ControlHook + 'static) -> Self {
        self.register_hook(hook);
        self
    }

    /// Builder form of [`register_fn`](Self::register_fn).
    pub fn with_fn<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut CacheControl, Option<&str>) + Send + Sync + 'static,
    {
        self.register_fn(hook);
        self
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Fresh control state for a new request.
    pub fn begin(&self) -> CacheControl {
        CacheControl::new()
    }

    /// Run the decision pipeline. Runs at most once per control state.
    pub fn finalize(&self, ctx: &RequestContext, esi: &EsiContext, control: &mut CacheControl) -> Stage {
        if control.is_finalized() {
            return Stage::AlreadyFinalized;
        }
        control.mark_finalized();

        let stage = self.run_stages(ctx, esi, control);
        tracing::debug!(
            request_id = %ctx.request_id,
            uri = %ctx.uri,
            stage = %stage,
            cacheable = control.get_cacheable(),
            "cache control finalized"
        );
        stage
    }

    fn run_stages(&self, ctx: &RequestContext, esi: &EsiContext, control: &mut CacheControl) -> Stage {
        // Hooks always run, even on an already vetoed state.
        let fragment_id = esi.fragment_id.as_deref();
        for hook in &self.hooks {
            hook.apply(control, fragment_id);
        }

        if !control.get_cacheable() {
            return Stage::Hooks;
        }

        if let Some(reason) = self.rules.evaluate(ctx, &self.config) {
            control.set_nocache(format!("Do not cache - {}", reason));
            return Stage::Exclusion(reason);
        }

        if ctx.is_admin_area() {
            control.set_nocache("admin page");
            return Stage::Admin;
        }

        if self.config.no_cache {
            control.set_nocache("no-cache override");
            return Stage::NoCacheOverride;
        }

        if ctx.is_password_protected_post() && !ctx.has_unlock_cookie {
            control.set_nocache("password protected post");
            return Stage::PasswordProtected;
        }

        if self.config.esi.loggedin {
            control.set_shared();
        }

        self.apply_mobile(ctx, control)
    }

    fn apply_mobile(&self, ctx: &RequestContext, control: &mut CacheControl) -> Stage {
        let mobile = ctx.host_detected_mobile || control.is_mobile();
        let mobile_config = &self.config.mobile;

        if !mobile_config.enabled {
            if mobile {
                control.set_nocache("mobile view disabled");
                return Stage::Mobile;
            }
            return Stage::Complete;
        }

        if mobile_config.serves_mobile_variant() {
            if !mobile {
                control.set_nocache("desktop request on mobile variant");
                return Stage::Mobile;
            }
        } else if mobile {
            control.set_nocache("mobile request on desktop variant");
            return Stage::Mobile;
        }

        Stage::Complete
    }

    /// TTL the response would get.
    pub fn ttl_for(&self, ctx: &RequestContext, control: &CacheControl) -> u32 {
        resolve_ttl(ctx, &self.config.ttl, control.custom_ttl())
    }

    /// Finalize (once) and render the cache-control header.
    pub fn output(&self, ctx: &RequestContext, esi: &EsiContext, control: &mut CacheControl) -> CacheControlHeader {
        self.finalize(ctx, esi, control);

        let ttl = self.ttl_for(ctx, control);
        let suffix = esi.suffix(self.config.esi.server);
        CacheControlHeader::new(format_value(control, ttl, suffix))
    }
}
