use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use mlua::{
    Lua, LuaSerdeExt, MetaMethod, Result as LuaResult, Table, UserData, UserDataFields,
    UserDataMethods, Value, Variadic,
};
use parking_lot::Mutex;

use crate::args::Arg;
use crate::color::{Color, ColorMode};
use crate::renderer::{Renderer3D, SketchError};

/// State shared by every global a sketch can call.
#[derive(Clone)]
pub(super) struct ScriptContext {
    pub renderer: Arc<Mutex<Renderer3D>>,
}

impl ScriptContext {
    pub fn new(renderer: Arc<Mutex<Renderer3D>>) -> Self {
        Self { renderer }
    }
}

pub(super) fn register_globals(lua: &Lua, context: &ScriptContext) -> LuaResult<()> {
    register_print(lua)?;
    register_datatypes(lua, context)?;
    register_color_mode(lua, context)?;
    register_lights(lua, context)?;
    lua.globals().set("frameCount", 0)?;
    Ok(())
}

fn register_print(lua: &Lua) -> LuaResult<()> {
    let print = lua.create_function(|lua, values: Variadic<Value>| {
        let mut out = Vec::new();
        for value in values.iter() {
            let text = match value {
                Value::Nil => "nil".to_string(),
                Value::Boolean(b) => b.to_string(),
                Value::String(s) => s.to_str()?.to_string(),
                _ => match lua.coerce_string(value.clone())? {
                    Some(s) => s.to_str()?.to_string(),
                    None => format!("{:?}", value),
                },
            };
            out.push(text);
        }
        println!("[Lua] {}", out.join("\t"));
        Ok(())
    })?;
    lua.globals().set("print", print)?;
    Ok(())
}

fn register_datatypes(lua: &Lua, context: &ScriptContext) -> LuaResult<()> {
    let globals = lua.globals();
    globals.set(
        "createVector",
        lua.create_function(|_, (x, y, z): (Option<f32>, Option<f32>, Option<f32>)| {
            Ok(LuaVector(Vec3::new(
                x.unwrap_or(0.0),
                y.unwrap_or(0.0),
                z.unwrap_or(0.0),
            )))
        })?,
    )?;

    let renderer = Arc::clone(&context.renderer);
    globals.set(
        "color",
        lua.create_function(move |_, values: Variadic<Value>| {
            let args = lua_args(values)?;
            let color = renderer.lock().color(&args).map_err(sketch_error)?;
            Ok(LuaColor(color))
        })?,
    )?;
    Ok(())
}

fn register_color_mode(lua: &Lua, context: &ScriptContext) -> LuaResult<()> {
    let globals = lua.globals();
    for mode in [ColorMode::Rgb, ColorMode::Hsb, ColorMode::Hsl] {
        globals.set(mode.name().to_ascii_uppercase(), mode.name())?;
    }

    let renderer = Arc::clone(&context.renderer);
    let color_mode = lua.create_function(move |_, (name, maxes): (String, Variadic<f32>)| {
        let mode = ColorMode::from_name(&name).ok_or_else(|| {
            mlua::Error::RuntimeError(format!("unknown color mode `{name}`"))
        })?;
        let mut renderer = renderer.lock();
        match maxes.as_slice() {
            [] => {
                renderer.color_mode(mode);
            }
            [max] => {
                renderer.color_mode_with_max(mode, *max).map_err(sketch_error)?;
            }
            [c0, c1, c2] => {
                let alpha = renderer.colors().maxes_for(mode)[3];
                renderer
                    .color_mode_with_maxes(mode, [*c0, *c1, *c2, alpha])
                    .map_err(sketch_error)?;
            }
            [c0, c1, c2, alpha] => {
                renderer
                    .color_mode_with_maxes(mode, [*c0, *c1, *c2, *alpha])
                    .map_err(sketch_error)?;
            }
            other => {
                return Err(mlua::Error::RuntimeError(format!(
                    "colorMode takes 1, 3 or 4 maxima, got {}",
                    other.len()
                )));
            }
        }
        Ok(())
    })?;
    globals.set("colorMode", color_mode)?;
    Ok(())
}

fn register_lights(lua: &Lua, context: &ScriptContext) -> LuaResult<()> {
    type LightCall =
        for<'a> fn(&'a mut Renderer3D, &[Arg]) -> Result<&'a mut Renderer3D, SketchError>;
    let calls: [(&str, LightCall); 4] = [
        ("ambientLight", Renderer3D::ambient_light),
        ("directionalLight", Renderer3D::directional_light),
        ("pointLight", Renderer3D::point_light),
        ("ambientMaterial", Renderer3D::ambient_material),
    ];

    let globals = lua.globals();
    for (name, call) in calls {
        let renderer = Arc::clone(&context.renderer);
        let function = lua.create_function(move |_, values: Variadic<Value>| {
            let args = lua_args(values)?;
            call(&mut renderer.lock(), &args).map_err(sketch_error)?;
            Ok(())
        })?;
        globals.set(name, function)?;
    }

    let renderer = Arc::clone(&context.renderer);
    let light_state = lua.create_function(move |lua, ()| {
        let state = *renderer.lock().light_state();
        lua.to_value(&state)
    })?;
    globals.set("lightState", light_state)?;
    Ok(())
}

fn sketch_error(err: SketchError) -> mlua::Error {
    mlua::Error::external(err)
}

fn lua_args(values: Variadic<Value>) -> LuaResult<Vec<Arg>> {
    values.into_iter().map(lua_arg).collect()
}

/// Maps one Lua value onto the argument shapes drawing calls understand.
fn lua_arg(value: Value) -> LuaResult<Arg> {
    let arg = match value {
        Value::Integer(i) => Arg::Number(i as f32),
        Value::Number(n) => Arg::Number(n as f32),
        Value::String(s) => Arg::Str(s.to_str()?.to_string()),
        Value::UserData(ud) => {
            if let Ok(color) = ud.borrow::<LuaColor>() {
                Arg::Color(color.0)
            } else if let Ok(vector) = ud.borrow::<LuaVector>() {
                Arg::vector(vector.0)
            } else {
                Arg::Other("userdata")
            }
        }
        Value::Table(table) => table_arg(table)?,
        other => Arg::Other(other.type_name()),
    };
    Ok(arg)
}

fn table_arg(table: Table) -> LuaResult<Arg> {
    if table.raw_len() > 0 {
        let values = table
            .sequence_values::<f32>()
            .collect::<LuaResult<Vec<f32>>>()?;
        return Ok(Arg::Array(values));
    }
    let mut fields = BTreeMap::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) = pair?;
        let Value::String(key) = key else {
            continue;
        };
        let number = match value {
            Value::Integer(i) => i as f32,
            Value::Number(n) => n as f32,
            _ => continue,
        };
        fields.insert(key.to_str()?.to_string(), number);
    }
    Ok(Arg::Object(fields))
}

#[derive(Debug, Clone, Copy)]
struct LuaVector(Vec3);

impl UserData for LuaVector {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.0.x));
        fields.add_field_method_get("y", |_, this| Ok(this.0.y));
        fields.add_field_method_get("z", |_, this| Ok(this.0.z));
        fields.add_field_method_set("x", |_, this, value: f32| {
            this.0.x = value;
            Ok(())
        });
        fields.add_field_method_set("y", |_, this, value: f32| {
            this.0.y = value;
            Ok(())
        });
        fields.add_field_method_set("z", |_, this, value: f32| {
            this.0.z = value;
            Ok(())
        });
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("vector({}, {}, {})", this.0.x, this.0.y, this.0.z))
        });
    }
}

/// Color userdata; channels read back as 8-bit levels.
#[derive(Debug, Clone, Copy)]
struct LuaColor(Color);

impl UserData for LuaColor {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("r", |_, this| Ok(this.0.r * 255.0));
        fields.add_field_method_get("g", |_, this| Ok(this.0.g * 255.0));
        fields.add_field_method_get("b", |_, this| Ok(this.0.b * 255.0));
        fields.add_field_method_get("a", |_, this| Ok(this.0.a * 255.0));
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            let [r, g, b, a] = this.0.to_array().map(|c| (c * 255.0).round());
            Ok(format!("color({r}, {g}, {b}, {a})"))
        });
    }
}
