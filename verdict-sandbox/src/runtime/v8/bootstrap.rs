//! Capability surface of a fresh context
//!
//! The bootstrap runs before any user code. It sweeps the global object down to an allowlist of
//! language intrinsics plus the granted capability globals, then installs the bounded
//! replacements (`console`, the `Math` subset). Anything it cannot remove makes the bootstrap
//! throw, and the call fails instead of running with a wider surface.

use crate::limits::{Capability, SandboxLimits};

/// Intrinsics every script gets. None of them reach the host.
const BASE_GLOBALS: &[&str] = &[
    "globalThis",
    "undefined",
    "NaN",
    "Infinity",
    "Object",
    "Array",
    "Number",
    "Boolean",
    "Symbol",
    "BigInt",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "Promise",
    "Proxy",
    "Reflect",
    "Iterator",
    "Error",
    "AggregateError",
    "EvalError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "encodeURI",
    "encodeURIComponent",
    "decodeURI",
    "decodeURIComponent",
];

/// Members of the frozen `Math` replacement.
pub const MATH_SUBSET: &[&str] = &["abs", "ceil", "floor", "max", "min", "round", "trunc", "sign"];

/// Host names a script may try to reach. A `ReferenceError` naming one of these is reported as
/// a capability violation instead of an ordinary runtime error.
pub const HOST_GLOBALS: &[&str] = &[
    "require",
    "process",
    "Deno",
    "Bun",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "setTimeout",
    "setInterval",
    "setImmediate",
    "queueMicrotask",
    "module",
    "exports",
    "global",
    "Buffer",
    "eval",
    "Function",
    "WebAssembly",
    "SharedArrayBuffer",
    "Atomics",
    "ArrayBuffer",
    "importScripts",
];

const TEMPLATE: &str = r#"
((keep, logging, math, mathSubset) => {
  "use strict";
  const g = globalThis;
  const emit = g.Deno.core.ops.op_sandbox_log;
  const stringify = g.JSON.stringify;
  const toStr = g.String;
  const hostMath = g.Math;
  const getProto = Object.getPrototypeOf;
  const defineProperty = Object.defineProperty;
  const freeze = Object.freeze;
  const allowed = new Set(keep);

  for (const name of Object.getOwnPropertyNames(g)) {
    if (allowed.has(name)) continue;
    try { delete g[name]; } catch (_) {}
    if (name in g) {
      try { defineProperty(g, name, { value: undefined }); } catch (_) {}
    }
    if (g[name] !== undefined) {
      throw new Error("sandbox bootstrap: cannot remove global " + name);
    }
  }

  const seal = (proto) => {
    if (proto) defineProperty(proto, "constructor", { value: undefined });
  };
  seal(getProto(function () {}));
  seal(getProto(async function () {}));
  seal(getProto(function* () {}));
  seal(getProto(async function* () {}));
  if (!allowed.has("String")) seal(toStr.prototype);
  if (!allowed.has("RegExp")) seal(getProto(/x/));

  if (math) {
    const subset = {};
    for (const key of mathSubset) subset[key] = hostMath[key];
    g.Math = freeze(subset);
  }

  if (logging) {
    const format = (args) => {
      const parts = [];
      for (const arg of args) {
        if (typeof arg === "string") {
          parts.push(arg);
          continue;
        }
        let text;
        try { text = stringify(arg); } catch (_) {}
        parts.push(text === undefined ? toStr(arg) : text);
      }
      return parts.join(" ");
    };
    const sink = (level) => (...args) => {
      emit({ level, message: format(args) });
    };
    g.console = freeze({
      log: sink("debug"),
      info: sink("debug"),
      debug: sink("debug"),
      warn: sink("warn"),
      error: sink("warn"),
    });
  }
})(__KEEP__, __LOGGING__, __MATH__, __MATH_SUBSET__);
"#;

/// Globals that survive the sweep for these limits
pub fn kept_globals(limits: &SandboxLimits) -> Vec<&'static str> {
    let mut keep = BASE_GLOBALS.to_vec();
    keep.extend(
        Capability::ALL
            .into_iter()
            .filter(|capability| limits.allows(*capability))
            // Installed after the sweep.
            .filter(|capability| !matches!(capability, Capability::Logging))
            .map(Capability::global_name),
    );
    keep
}

/// Render the bootstrap script for one call.
pub fn bootstrap_script(limits: &SandboxLimits) -> String {
    TEMPLATE
        .replace("__KEEP__", &json_list(&kept_globals(limits)))
        .replace("__LOGGING__", bool_literal(limits.allows(Capability::Logging)))
        .replace("__MATH__", bool_literal(limits.allows(Capability::Math)))
        .replace("__MATH_SUBSET__", &json_list(MATH_SUBSET))
}

/// Whether `name` is a host global or a global of a capability these limits deny.
pub fn is_restricted_name(name: &str, limits: &SandboxLimits) -> bool {
    HOST_GLOBALS.contains(&name) || limits.denied_globals().contains(&name)
}

fn json_list(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn bool_literal(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
