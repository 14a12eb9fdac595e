//! A minimal `Date`.
//!
//! Go's `time` package constructs a `Date` at startup to read the local
//! timezone offset.  Dates here carry milliseconds since the Unix epoch and
//! always report UTC.

use std::any::Any;
use std::time::{SystemTime, UNIX_EPOCH};

use super::host::HostObject;
use super::object::Object;
use super::realm::Realm;
use super::value::{JsResult, Value};
use crate::context::Scope;

/// Native state of a `Date` object.
pub struct DateObject {
    time: f64,
}

impl DateObject {
    /// Milliseconds since the Unix epoch; `NaN` for an invalid date.
    pub fn time(&self) -> f64 {
        self.time
    }
}

impl HostObject for DateObject {
    fn class_name(&self) -> &'static str {
        "Date"
    }

    fn get(&self, _scope: &mut Scope<'_>, _key: &str) -> JsResult<Option<Value>> {
        Ok(None)
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_millis() as f64)
}

/// `TimeClip`.
fn clip(ms: f64) -> f64 {
    if ms.is_finite() && ms.abs() <= 8.64e15 {
        ms.trunc()
    } else {
        f64::NAN
    }
}

fn this_time(scope: &Scope<'_>, this: &Value, method: &str) -> JsResult<f64> {
    this.as_object()
        .and_then(Object::host::<DateObject>)
        .map(DateObject::time)
        .ok_or_else(|| scope.type_error(format!("Date.prototype.{method}: this is not a Date object")))
}

pub(crate) fn install(realm: &Realm) {
    let proto = realm.new_object();

    let ctor_proto = proto.clone();
    let ctor = realm.new_constructor("Date", &proto, move |scope, _, args| {
        let time = match args.first() {
            None => now_ms(),
            Some(v) => clip(v.as_number().unwrap_or(f64::NAN)),
        };
        Ok(scope.realm().new_host(DateObject { time }, &ctor_proto).into())
    });
    ctor.set_own("now", realm.new_function("now", |_, _, _| Ok(Value::Number(now_ms()))));

    for name in ["getTime", "valueOf"] {
        proto.set_own(
            name,
            realm.new_function(name, move |scope, this, _| {
                Ok(Value::Number(this_time(scope, this, name)?))
            }),
        );
    }
    proto.set_own(
        "getTimezoneOffset",
        realm.new_function("getTimezoneOffset", |scope, this, _| {
            let time = this_time(scope, this, "getTimezoneOffset")?;
            Ok(if time.is_nan() {
                Value::Number(f64::NAN)
            } else {
                Value::Integer(0)
            })
        }),
    );

    realm.global().set_own("Date", ctor);
}
