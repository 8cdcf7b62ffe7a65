//! JavaScript Engine Module (rquickjs)
//!
//! Runs a page's inline scripts without a browser so that the global state
//! containers they assign can be read back. Uses `QuickJS` via rquickjs
//! bindings (ES2020) with a small DOM shim that makes `window`, `document`,
//! `location` and `navigator` resolve.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use rquickjs::{CatchResultExt, Context, Function, Runtime, Type, Value};
use tracing::debug;
use url::Url;

const MEMORY_LIMIT: usize = 64 * 1024 * 1024;
const STACK_LIMIT: usize = 1024 * 1024;

/// Embedded JavaScript engine with a per-engine execution deadline.
pub struct JsEngine {
    runtime: Runtime,
    context: Context,
}

impl JsEngine {
    /// Create an engine whose scripts are interrupted once `budget` has elapsed.
    pub fn new(budget: Duration) -> Result<Self> {
        let runtime = Runtime::new()?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(STACK_LIMIT);

        let deadline = Instant::now() + budget;
        runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

        let context = Context::full(&runtime)?;
        Ok(Self { runtime, context })
    }

    /// Execute JavaScript and return the completion value as a string.
    ///
    /// Objects and arrays are returned as JSON.
    pub fn eval(&self, code: &str) -> Result<String> {
        debug!("Evaluating JS: {} chars", code.len());

        self.context.with(|ctx| {
            let result: Value = ctx
                .eval(code)
                .catch(&ctx)
                .map_err(|e| anyhow!("{e}"))?;

            let out = match result.type_of() {
                Type::Undefined => "undefined".to_string(),
                Type::Null => "null".to_string(),
                Type::Bool => result.get::<bool>()?.to_string(),
                Type::Int => result.get::<i32>()?.to_string(),
                Type::Float => result.get::<f64>()?.to_string(),
                Type::String => result.get::<String>()?,
                Type::Object | Type::Array => {
                    let json: rquickjs::Object = ctx.globals().get("JSON")?;
                    let stringify: Function = json.get("stringify")?;
                    stringify
                        .call::<_, Option<String>>((result,))
                        .catch(&ctx)
                        .map_err(|e| anyhow!("{e}"))?
                        .unwrap_or_else(|| "undefined".to_string())
                }
                other => format!("[{other:?}]"),
            };

            Ok(out)
        })
    }

    /// Execute a script for its side effects.
    pub fn run(&self, code: &str) -> Result<()> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(code)
                .catch(&ctx)
                .map_err(|e| anyhow!("{e}"))
        })
    }

    /// Run queued promise jobs until the queue is empty or a job fails.
    pub fn drain_jobs(&self) {
        while self.runtime.is_job_pending() {
            if self.runtime.execute_pending_job().is_err() {
                break;
            }
        }
    }

    /// Inject a string global.
    pub fn set_global(&self, name: &str, value: &str) -> Result<()> {
        self.context.with(|ctx| {
            ctx.globals().set(name, value)?;
            Ok(())
        })
    }

    /// Install the DOM shim for a page at `url`, as seen by `user_agent`.
    pub fn install_dom(&self, url: &Url, user_agent: &str) -> Result<()> {
        self.set_global("__page_href", url.as_str())?;
        self.set_global("__page_host", url.host_str().unwrap_or_default())?;
        self.set_global("__page_path", url.path())?;
        self.set_global("__page_search", url.query().map(|q| format!("?{q}")).as_deref().unwrap_or(""))?;
        self.set_global("__user_agent", user_agent)?;
        self.run(DOM_SHIM)
    }
}

const DOM_SHIM: &str = r"
    var window = globalThis;
    var self = globalThis;

    function __element(tag) {
        return {
            tagName: String(tag).toUpperCase(),
            children: [],
            attributes: {},
            style: {},
            dataset: {},
            innerHTML: '',
            textContent: '',
            classList: {
                _c: [],
                add: function(c) { this._c.push(c); },
                remove: function(c) { var i = this._c.indexOf(c); if (i > -1) this._c.splice(i, 1); },
                contains: function(c) { return this._c.indexOf(c) > -1; }
            },
            appendChild: function(child) { this.children.push(child); return child; },
            removeChild: function(child) { return child; },
            setAttribute: function(k, v) { this.attributes[k] = String(v); },
            getAttribute: function(k) { return k in this.attributes ? this.attributes[k] : null; },
            addEventListener: function() {},
            removeEventListener: function() {},
            querySelector: function() { return null; },
            querySelectorAll: function() { return []; }
        };
    }

    var document = __element('#document');
    document.documentElement = __element('html');
    document.head = __element('head');
    document.body = __element('body');
    document.cookie = '';
    document.readyState = 'complete';
    document.getElementById = function() { return null; };
    document.getElementsByTagName = function() { return []; };
    document.getElementsByClassName = function() { return []; };
    document.createElement = __element;
    document.createTextNode = function(text) { return { nodeType: 3, textContent: text }; };

    var location = {
        href: __page_href,
        hostname: __page_host,
        host: __page_host,
        pathname: __page_path,
        search: __page_search,
        hash: '',
        protocol: 'https:',
        origin: 'https://' + __page_host
    };

    var navigator = {
        userAgent: __user_agent,
        language: 'en-US',
        languages: ['en-US', 'en'],
        platform: '',
        cookieEnabled: true
    };

    function __storage() {
        return {
            _d: {},
            getItem: function(k) { return k in this._d ? this._d[k] : null; },
            setItem: function(k, v) { this._d[k] = String(v); },
            removeItem: function(k) { delete this._d[k]; },
            clear: function() { this._d = {}; }
        };
    }
    var localStorage = __storage();
    var sessionStorage = __storage();

    var setTimeout = function() { return 0; };
    var setInterval = function() { return 0; };
    var clearTimeout = function() {};
    var clearInterval = function() {};
    var requestAnimationFrame = function() { return 0; };
    var addEventListener = function() {};
    var removeEventListener = function() {};

    if (typeof console === 'undefined') {
        var console = {
            log: function() {}, error: function() {}, warn: function() {},
            info: function() {}, debug: function() {}
        };
    }
";
