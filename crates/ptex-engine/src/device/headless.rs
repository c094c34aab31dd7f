use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::{GlDevice, GlVersion, ShaderStage, TextureTarget};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HeadlessShader(u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HeadlessProgram(u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HeadlessTexture(u32);

/// Uniform location; only valid for the program it was queried from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HeadlessLocation {
    program: u32,
    index: i32,
}

/// Last value uploaded to a uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Mat4([f32; 16]),
}

struct ShaderObject {
    stage: ShaderStage,
    compiled: bool,
    uniforms: Vec<String>,
}

struct ProgramObject {
    attached: Vec<(ShaderStage, bool, Vec<String>)>,
    linked: bool,
    /// Active uniforms; the index is the location.
    uniforms: Vec<String>,
    values: HashMap<i32, (UniformValue, usize)>,
}

struct TextureObject {
    target: TextureTarget,
    width: i32,
}

struct State {
    version: GlVersion,
    next_name: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    textures: HashMap<u32, TextureObject>,
    units: BTreeMap<u32, (TextureTarget, HeadlessTexture)>,
    current_program: Option<u32>,
    compile_calls: usize,
    errors: Vec<String>,
}

impl State {
    fn gen_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }
}

/// In-process stand-in for an OpenGL context.
///
/// It checks GLSL sources for a supported `#version` line and a `main`
/// function, collects `uniform` declarations as the active uniforms of a
/// linked program, and records uploads and texture-unit bindings so they can
/// be read back. Misuse that a real driver would flag with
/// `GL_INVALID_OPERATION` is recorded in [`HeadlessDevice::errors`].
///
/// Clones share state, so a test can keep one clone for inspection while a
/// renderer owns another.
#[derive(Clone)]
pub struct HeadlessDevice {
    state: Rc<RefCell<State>>,
}

impl HeadlessDevice {
    pub fn new(version: GlVersion) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                version,
                next_name: 0,
                shaders: HashMap::new(),
                programs: HashMap::new(),
                textures: HashMap::new(),
                units: BTreeMap::new(),
                current_program: None,
                compile_calls: 0,
                errors: Vec::new(),
            })),
        }
    }

    /// Allocates a 2-D texture with the given base-level size.
    /// Only the width is tracked.
    pub fn create_texture_2d(&self, width: i32, _height: i32) -> HeadlessTexture {
        self.create_texture(TextureTarget::Texture2d, width)
    }

    /// Allocates a buffer texture holding `texels` elements.
    pub fn create_buffer_texture(&self, texels: i32) -> HeadlessTexture {
        self.create_texture(TextureTarget::Buffer, texels)
    }

    fn create_texture(&self, target: TextureTarget, width: i32) -> HeadlessTexture {
        let mut s = self.state.borrow_mut();
        let name = s.gen_name();
        s.textures.insert(name, TextureObject { target, width });
        HeadlessTexture(name)
    }

    pub fn delete_texture(&self, texture: HeadlessTexture) {
        let mut s = self.state.borrow_mut();
        s.textures.remove(&texture.0);
        s.units.retain(|_, (_, t)| *t != texture);
    }

    /// Last value uploaded to `name` in `program`, if any.
    pub fn uniform(&self, program: HeadlessProgram, name: &str) -> Option<UniformValue> {
        let s = self.state.borrow();
        let p = s.programs.get(&program.0)?;
        let index = p.uniforms.iter().position(|u| u == name)? as i32;
        p.values.get(&index).map(|(v, _)| *v)
    }

    /// Number of uploads made to `name` in `program`.
    pub fn upload_count(&self, program: HeadlessProgram, name: &str) -> usize {
        let s = self.state.borrow();
        let Some(p) = s.programs.get(&program.0) else { return 0 };
        let Some(index) = p.uniforms.iter().position(|u| u == name) else { return 0 };
        p.values.get(&(index as i32)).map_or(0, |(_, n)| *n)
    }

    /// Texture currently bound to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<(TextureTarget, HeadlessTexture)> {
        self.state.borrow().units.get(&unit).copied()
    }

    pub fn current_program(&self) -> Option<HeadlessProgram> {
        self.state.borrow().current_program.map(HeadlessProgram)
    }

    /// Number of compile attempts made on this device.
    pub fn compile_calls(&self) -> usize {
        self.state.borrow().compile_calls
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Errors a real driver would have raised.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }
}

impl core::fmt::Debug for HeadlessDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessDevice")
            .field("version", &s.version)
            .field("programs", &s.programs.len())
            .field("shaders", &s.shaders.len())
            .finish()
    }
}

/// Parses `#version 410 core` into `410`.
fn declared_version(source: &str) -> Option<u32> {
    source
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("//"))?
        .strip_prefix("#version")?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// Names declared with `uniform <type> a, b[2];` at line start.
fn declared_uniforms(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in source.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        let Some(rest) = line.strip_prefix("uniform ") else { continue };
        let decl = rest.split(';').next().unwrap_or_default();

        let mut tokens = decl.split_whitespace().peekable();
        if matches!(tokens.peek(), Some(&("lowp" | "mediump" | "highp"))) {
            tokens.next();
        }
        // Type name.
        tokens.next();

        let list = tokens.collect::<Vec<_>>().join(" ");
        for name in list.split(',') {
            let name = name.split('[').next().unwrap_or_default().trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
    }
    names
}

impl GlDevice for HeadlessDevice {
    type Shader = HeadlessShader;
    type Program = HeadlessProgram;
    type UniformLocation = HeadlessLocation;
    type Texture = HeadlessTexture;

    fn version(&self) -> GlVersion {
        self.state.borrow().version
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        let mut s = self.state.borrow_mut();
        if stage == ShaderStage::Geometry && !s.version.supports(GlVersion::desktop(3, 2)) {
            return Err(format!("geometry shaders are not available on {}", s.version));
        }
        let name = s.gen_name();
        s.shaders.insert(name, ShaderObject { stage, compiled: false, uniforms: Vec::new() });
        Ok(HeadlessShader(name))
    }

    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String> {
        let mut s = self.state.borrow_mut();
        s.compile_calls += 1;
        let context_glsl = s.version.major * 100 + s.version.minor * 10;

        let Some(object) = s.shaders.get_mut(&shader.0) else {
            return Err(format!("shader {} does not exist", shader.0));
        };

        let result = match declared_version(source) {
            None => Err("0:1: error: missing #version directive".to_owned()),
            Some(v) if v > context_glsl => {
                Err(format!("0:1: error: GLSL {v} is not supported by this context"))
            }
            Some(_) if !source.contains("void main") => {
                Err("0:0: error: no definition of main()".to_owned())
            }
            Some(_) => Ok(()),
        };

        object.compiled = result.is_ok();
        object.uniforms = if object.compiled { declared_uniforms(source) } else { Vec::new() };
        result
    }

    fn delete_shader(&self, shader: Self::Shader) {
        self.state.borrow_mut().shaders.remove(&shader.0);
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        let mut s = self.state.borrow_mut();
        let name = s.gen_name();
        s.programs.insert(
            name,
            ProgramObject {
                attached: Vec::new(),
                linked: false,
                uniforms: Vec::new(),
                values: HashMap::new(),
            },
        );
        Ok(HeadlessProgram(name))
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let mut s = self.state.borrow_mut();
        let Some(object) = s.shaders.get(&shader.0) else {
            s.errors.push(format!("attach of unknown shader {}", shader.0));
            return;
        };
        let entry = (object.stage, object.compiled, object.uniforms.clone());
        match s.programs.get_mut(&program.0) {
            Some(p) => p.attached.push(entry),
            None => s.errors.push(format!("attach to unknown program {}", program.0)),
        }
    }

    fn link_program(&self, program: Self::Program) -> Result<(), String> {
        let mut s = self.state.borrow_mut();
        let Some(p) = s.programs.get_mut(&program.0) else {
            return Err(format!("program {} does not exist", program.0));
        };

        if p.attached.iter().any(|(_, compiled, _)| !compiled) {
            return Err("error: attached shader is not compiled".to_owned());
        }
        for stage in [ShaderStage::Vertex, ShaderStage::Geometry, ShaderStage::Fragment] {
            let count = p.attached.iter().filter(|(st, _, _)| *st == stage).count();
            if count > 1 {
                return Err(format!("error: multiple {stage} shaders attached"));
            }
            if count == 0 && stage != ShaderStage::Geometry {
                return Err(format!("error: no {stage} shader attached"));
            }
        }

        let mut uniforms: Vec<String> = Vec::new();
        for (_, _, names) in &p.attached {
            for name in names {
                if !uniforms.contains(name) {
                    uniforms.push(name.clone());
                }
            }
        }
        p.uniforms = uniforms;
        p.values.clear();
        p.linked = true;
        Ok(())
    }

    fn delete_program(&self, program: Self::Program) {
        let mut s = self.state.borrow_mut();
        s.programs.remove(&program.0);
        if s.current_program == Some(program.0) {
            s.current_program = None;
        }
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        let s = self.state.borrow();
        let p = s.programs.get(&program.0).filter(|p| p.linked)?;
        let index = p.uniforms.iter().position(|u| u == name)?;
        Some(HeadlessLocation { program: program.0, index: index as i32 })
    }

    fn use_program(&self, program: Self::Program) {
        let mut s = self.state.borrow_mut();
        if s.programs.get(&program.0).is_some_and(|p| p.linked) {
            s.current_program = Some(program.0);
        } else {
            s.errors.push(format!("use of unlinked program {}", program.0));
        }
    }

    fn set_uniform_i32(&self, location: &Self::UniformLocation, value: i32) {
        upload(&mut self.state.borrow_mut(), location, UniformValue::Int(value));
    }

    fn set_uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        upload(&mut self.state.borrow_mut(), location, UniformValue::Float(value));
    }

    fn set_uniform_mat4(&self, location: &Self::UniformLocation, value: &[f32; 16]) {
        upload(&mut self.state.borrow_mut(), location, UniformValue::Mat4(*value));
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Self::Texture) {
        let mut s = self.state.borrow_mut();
        match s.textures.get(&texture.0) {
            Some(t) if t.target != target => {
                s.errors.push(format!("texture {} bound to the wrong target", texture.0));
            }
            Some(_) => {
                s.units.insert(unit, (target, texture));
            }
            None => s.errors.push(format!("bind of unknown texture {}", texture.0)),
        }
    }

    fn texture_width(&self, texture: Self::Texture, level: i32) -> i32 {
        let s = self.state.borrow();
        match s.textures.get(&texture.0) {
            Some(t) => (t.width >> level.clamp(0, 31)).max(1),
            None => 0,
        }
    }
}

fn upload(s: &mut State, location: &HeadlessLocation, value: UniformValue) {
    if s.current_program != Some(location.program) {
        s.errors.push(format!(
            "uniform upload to program {} while it is not current",
            location.program
        ));
        return;
    }
    if let Some(p) = s.programs.get_mut(&location.program) {
        let slot = p.values.entry(location.index).or_insert((value, 0));
        slot.0 = value;
        slot.1 += 1;
    }
}
