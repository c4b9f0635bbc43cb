//! Recording [`GraphicsContext`] with no GPU behind it
//!
//! Hands out nonzero names, tracks which objects are alive, keeps uploaded
//! buffer and texture bytes, and raises GL error codes for the misuse a real
//! driver would reject (binding deleted names, drawing without a program or
//! vertex array, sampling from an incomplete framebuffer). Deleting a name
//! that is not alive raises `GL_INVALID_VALUE`, which is stricter than GL and
//! catches double releases.

use std::cell::RefCell;
use std::collections::HashMap;

use super::context::{GraphicsContext, NativeId, UniformLocation};

/// Kind of native object a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Shader object
    Shader,
    /// Program object
    Program,
    /// Texture object
    Texture,
    /// Framebuffer object
    Framebuffer,
    /// Renderbuffer object
    Renderbuffer,
    /// Buffer object
    Buffer,
    /// Vertex array object
    VertexArray,
}

/// Last value written to a uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `int` or sampler
    Int(i32),
    /// `float`
    Float(f32),
    /// `vec3`
    Vec3([f32; 3]),
    /// `ivec4`
    IVec4([i32; 4]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat3` / `mat4`, column-major
    Matrix(Vec<f32>),
}

#[derive(Debug, Default)]
struct ShaderState {
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramState {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    locations: HashMap<String, u32>,
    values: HashMap<u32, UniformValue>,
    blocks: HashMap<String, u32>,
}

#[derive(Debug, Default)]
struct TextureState {
    target: Option<u32>,
    size: (i32, i32, i32),
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct FramebufferState {
    attachments: HashMap<u32, u32>,
}

#[derive(Debug, Default)]
struct VertexArrayState {
    element_buffer: Option<u32>,
    enabled: Vec<u32>,
}

#[derive(Debug)]
enum Object {
    Shader(ShaderState),
    Program(ProgramState),
    Texture(TextureState),
    Framebuffer(FramebufferState),
    Renderbuffer((i32, i32)),
    Buffer(Vec<u8>),
    VertexArray(VertexArrayState),
}

impl Object {
    const fn kind(&self) -> ObjectKind {
        match self {
            Self::Shader(_) => ObjectKind::Shader,
            Self::Program(_) => ObjectKind::Program,
            Self::Texture(_) => ObjectKind::Texture,
            Self::Framebuffer(_) => ObjectKind::Framebuffer,
            Self::Renderbuffer(_) => ObjectKind::Renderbuffer,
            Self::Buffer(_) => ObjectKind::Buffer,
            Self::VertexArray(_) => ObjectKind::VertexArray,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_name: u32,
    objects: HashMap<u32, Object>,
    pending_error: u32,
    errors_raised: usize,

    program: Option<u32>,
    active_unit: u32,
    textures: HashMap<(u32, u32), u32>,
    read_framebuffer: Option<u32>,
    draw_framebuffer: Option<u32>,
    renderbuffer: Option<u32>,
    buffers: HashMap<u32, u32>,
    buffer_bases: HashMap<(u32, u32), u32>,
    vertex_array: Option<u32>,

    viewport: (i32, i32, i32, i32),
    depth_func: u32,
    capabilities: Vec<u32>,
    draw_calls: usize,
    blits: usize,
    clears: usize,
    fail_marker: Option<String>,
    fail_creation: bool,
}

impl State {
    fn raise(&mut self, code: u32) {
        self.errors_raised += 1;
        log::trace!("headless GL error {code:#06x}");
        if self.pending_error == glow::NO_ERROR {
            self.pending_error = code;
        }
    }

    fn allocate(&mut self, object: Object) -> Result<NativeId, String> {
        if self.fail_creation {
            return Err("out of object names".to_string());
        }
        self.next_name += 1;
        let name = self.next_name;
        self.objects.insert(name, object);
        NativeId::new(name).ok_or_else(|| "name counter wrapped".to_string())
    }

    fn is_kind(&self, name: u32, kind: ObjectKind) -> bool {
        self.objects.get(&name).is_some_and(|o| o.kind() == kind)
    }

    fn release(&mut self, name: NativeId, kind: ObjectKind) {
        let name = name.get();
        if !self.is_kind(name, kind) {
            self.raise(glow::INVALID_VALUE);
            return;
        }
        self.objects.remove(&name);

        // Deleting a bound object unbinds it
        match kind {
            ObjectKind::Program if self.program == Some(name) => self.program = None,
            ObjectKind::Texture => self.textures.retain(|_, bound| *bound != name),
            ObjectKind::Framebuffer => {
                if self.read_framebuffer == Some(name) {
                    self.read_framebuffer = None;
                }
                if self.draw_framebuffer == Some(name) {
                    self.draw_framebuffer = None;
                }
            }
            ObjectKind::Renderbuffer if self.renderbuffer == Some(name) => self.renderbuffer = None,
            ObjectKind::Buffer => {
                self.buffers.retain(|_, bound| *bound != name);
                self.buffer_bases.retain(|_, bound| *bound != name);
            }
            ObjectKind::VertexArray if self.vertex_array == Some(name) => self.vertex_array = None,
            _ => {}
        }
    }

    fn bind_check(&mut self, name: Option<NativeId>, kind: ObjectKind) -> Option<Option<u32>> {
        match name {
            None => Some(None),
            Some(name) if self.is_kind(name.get(), kind) => Some(Some(name.get())),
            Some(_) => {
                self.raise(glow::INVALID_OPERATION);
                None
            }
        }
    }

    fn program_mut(&mut self, name: NativeId) -> Option<&mut ProgramState> {
        match self.objects.get_mut(&name.get()) {
            Some(Object::Program(program)) => Some(program),
            _ => None,
        }
    }

    fn shader_mut(&mut self, name: NativeId) -> Option<&mut ShaderState> {
        match self.objects.get_mut(&name.get()) {
            Some(Object::Shader(shader)) => Some(shader),
            _ => None,
        }
    }

    fn bound_texture_mut(&mut self, target: u32) -> Option<&mut TextureState> {
        let binding_target = if is_cube_face(target) {
            glow::TEXTURE_CUBE_MAP
        } else {
            target
        };
        let name = *self.textures.get(&(self.active_unit, binding_target))?;
        match self.objects.get_mut(&name) {
            Some(Object::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    fn bound_buffer_mut(&mut self, target: u32) -> Option<&mut Vec<u8>> {
        let name = if target == glow::ELEMENT_ARRAY_BUFFER {
            match self.vertex_array.and_then(|vao| self.objects.get(&vao)) {
                Some(Object::VertexArray(vao)) => vao.element_buffer?,
                _ => return None,
            }
        } else {
            *self.buffers.get(&target)?
        };
        match self.objects.get_mut(&name) {
            Some(Object::Buffer(data)) => Some(data),
            _ => None,
        }
    }

    fn framebuffer_for(&self, target: u32) -> Option<u32> {
        if target == glow::READ_FRAMEBUFFER {
            self.read_framebuffer
        } else {
            self.draw_framebuffer
        }
    }

    fn framebuffer_status(&self, name: Option<u32>) -> u32 {
        let Some(name) = name else {
            // The default framebuffer is always complete
            return glow::FRAMEBUFFER_COMPLETE;
        };
        match self.objects.get(&name) {
            Some(Object::Framebuffer(fb)) if fb.attachments.is_empty() => {
                glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
            }
            Some(Object::Framebuffer(fb)) => {
                if fb.attachments.values().all(|a| self.objects.contains_key(a)) {
                    glow::FRAMEBUFFER_COMPLETE
                } else {
                    glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
                }
            }
            _ => glow::FRAMEBUFFER_UNDEFINED,
        }
    }

    fn set_uniform(&mut self, location: Option<&UniformLocation>, value: UniformValue) {
        let Some(location) = location else {
            // Location -1 is silently ignored by GL
            return;
        };
        let Some(program) = self.program else {
            self.raise(glow::INVALID_OPERATION);
            return;
        };
        match self.objects.get_mut(&program) {
            Some(Object::Program(state)) => {
                state.values.insert(location.0, value);
            }
            _ => self.raise(glow::INVALID_OPERATION),
        }
    }

    fn check_draw(&mut self) -> bool {
        let program_ok = self
            .program
            .is_some_and(|p| matches!(self.objects.get(&p), Some(Object::Program(s)) if s.linked));
        if !program_ok || self.vertex_array.is_none() {
            self.raise(glow::INVALID_OPERATION);
            return false;
        }
        if self.framebuffer_status(self.draw_framebuffer) != glow::FRAMEBUFFER_COMPLETE {
            self.raise(glow::INVALID_FRAMEBUFFER_OPERATION);
            return false;
        }
        true
    }
}

const fn is_cube_face(target: u32) -> bool {
    target >= glow::TEXTURE_CUBE_MAP_POSITIVE_X && target <= glow::TEXTURE_CUBE_MAP_NEGATIVE_Z
}

/// Software stand-in for a GL context
#[derive(Debug, Default)]
pub struct HeadlessContext {
    state: RefCell<State>,
}

impl HeadlessContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later compile whose source contains `marker` fail
    pub fn fail_compilation_containing(&self, marker: &str) {
        self.state.borrow_mut().fail_marker = Some(marker.to_string());
    }

    /// Make every later object creation fail as if the driver ran out of names
    pub fn set_creation_failure(&self, fail: bool) {
        self.state.borrow_mut().fail_creation = fail;
    }

    /// Number of live native objects of every kind
    pub fn live_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Number of live native objects of `kind`
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state
            .borrow()
            .objects
            .values()
            .filter(|o| o.kind() == kind)
            .count()
    }

    /// True while `name` refers to a live object
    pub fn is_alive(&self, name: NativeId) -> bool {
        self.state.borrow().objects.contains_key(&name.get())
    }

    /// Bytes last uploaded to level 0 of a texture, across all layers or faces
    pub fn texture_data(&self, name: NativeId) -> Option<Vec<u8>> {
        match self.state.borrow().objects.get(&name.get()) {
            Some(Object::Texture(texture)) => Some(texture.data.clone()),
            _ => None,
        }
    }

    /// Allocated `(width, height, depth)` of a texture
    pub fn texture_size(&self, name: NativeId) -> Option<(i32, i32, i32)> {
        match self.state.borrow().objects.get(&name.get()) {
            Some(Object::Texture(texture)) => Some(texture.size),
            _ => None,
        }
    }

    /// Contents of a buffer object
    pub fn buffer_contents(&self, name: NativeId) -> Option<Vec<u8>> {
        match self.state.borrow().objects.get(&name.get()) {
            Some(Object::Buffer(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Last value written to `name` in `program`
    pub fn uniform(&self, program: NativeId, name: &str) -> Option<UniformValue> {
        match self.state.borrow().objects.get(&program.get()) {
            Some(Object::Program(state)) => {
                let location = state.locations.get(name)?;
                state.values.get(location).cloned()
            }
            _ => None,
        }
    }

    /// Number of draw calls accepted so far
    pub fn draw_calls(&self) -> usize {
        self.state.borrow().draw_calls
    }

    /// Number of framebuffer blits accepted so far
    pub fn blits(&self) -> usize {
        self.state.borrow().blits
    }

    /// Number of clears issued
    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }

    /// Total errors raised, including ones already popped by `get_error`
    pub fn errors_raised(&self) -> usize {
        self.state.borrow().errors_raised
    }

    /// Last viewport rectangle
    pub fn current_viewport(&self) -> (i32, i32, i32, i32) {
        self.state.borrow().viewport
    }

    /// Current depth comparison function
    pub fn current_depth_func(&self) -> u32 {
        self.state.borrow().depth_func
    }

    /// Program currently in use
    pub fn current_program(&self) -> Option<NativeId> {
        self.state.borrow().program.and_then(NativeId::new)
    }

    /// True while `capability` is enabled
    pub fn is_enabled(&self, capability: u32) -> bool {
        self.state.borrow().capabilities.contains(&capability)
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_shader(&self, kind: u32) -> Result<NativeId, String> {
        let mut state = self.state.borrow_mut();
        match kind {
            glow::VERTEX_SHADER
            | glow::FRAGMENT_SHADER
            | glow::TESS_CONTROL_SHADER
            | glow::TESS_EVALUATION_SHADER
            | glow::GEOMETRY_SHADER => state.allocate(Object::Shader(ShaderState::default())),
            _ => {
                state.raise(glow::INVALID_ENUM);
                Err(format!("invalid shader type {kind:#06x}"))
            }
        }
    }

    fn shader_source(&self, shader: NativeId, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shader_mut(shader) {
            Some(s) => s.source = source.to_string(),
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: NativeId) {
        let mut state = self.state.borrow_mut();
        let marker = state.fail_marker.clone();
        match state.shader_mut(shader) {
            Some(s) => match marker {
                Some(marker) if s.source.contains(&marker) => {
                    s.compiled = false;
                    s.log = format!("0:1(1): error: syntax error near '{marker}'");
                }
                _ => {
                    s.compiled = true;
                    s.log.clear();
                }
            },
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn shader_compile_status(&self, shader: NativeId) -> bool {
        self.state
            .borrow_mut()
            .shader_mut(shader)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: NativeId) -> String {
        self.state
            .borrow_mut()
            .shader_mut(shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: NativeId) {
        let mut state = self.state.borrow_mut();
        state.release(shader, ObjectKind::Shader);
        for object in state.objects.values_mut() {
            if let Object::Program(program) = object {
                program.attached.retain(|s| *s != shader.get());
            }
        }
    }

    fn create_program(&self) -> Result<NativeId, String> {
        self.state
            .borrow_mut()
            .allocate(Object::Program(ProgramState::default()))
    }

    fn attach_shader(&self, program: NativeId, shader: NativeId) {
        let mut state = self.state.borrow_mut();
        if !state.is_kind(shader.get(), ObjectKind::Shader) {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        match state.program_mut(program) {
            Some(p) if p.attached.contains(&shader.get()) => state.raise(glow::INVALID_OPERATION),
            Some(p) => p.attached.push(shader.get()),
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn detach_shader(&self, program: NativeId, shader: NativeId) {
        let mut state = self.state.borrow_mut();
        match state.program_mut(program) {
            Some(p) if p.attached.contains(&shader.get()) => p.attached.retain(|s| *s != shader.get()),
            Some(_) => state.raise(glow::INVALID_OPERATION),
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn link_program(&self, program: NativeId) {
        let mut state = self.state.borrow_mut();
        let attached = match state.program_mut(program) {
            Some(p) => p.attached.clone(),
            None => {
                state.raise(glow::INVALID_VALUE);
                return;
            }
        };
        let all_compiled = attached
            .iter()
            .all(|s| matches!(state.objects.get(s), Some(Object::Shader(shader)) if shader.compiled));

        if let Some(p) = state.program_mut(program) {
            if attached.is_empty() {
                p.linked = false;
                p.log = "error: no shaders attached to the program".to_string();
            } else if !all_compiled {
                p.linked = false;
                p.log = "error: linking with uncompiled shader".to_string();
            } else {
                p.linked = true;
                p.log.clear();
            }
        }
    }

    fn program_link_status(&self, program: NativeId) -> bool {
        self.state
            .borrow_mut()
            .program_mut(program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: NativeId) -> String {
        self.state
            .borrow_mut()
            .program_mut(program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: NativeId) {
        self.state.borrow_mut().release(program, ObjectKind::Program);
    }

    fn use_program(&self, program: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        if let Some(name) = program {
            let linked = state.program_mut(name).map(|p| p.linked);
            if linked != Some(true) {
                state.raise(glow::INVALID_OPERATION);
                return;
            }
        }
        state.program = program.map(NativeId::get);
    }

    fn uniform_location(&self, program: NativeId, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        let Some(p) = state.program_mut(program) else {
            state.raise(glow::INVALID_VALUE);
            return None;
        };
        if !p.linked {
            state.raise(glow::INVALID_OPERATION);
            return None;
        }
        let next = p.locations.len() as u32;
        Some(UniformLocation(*p.locations.entry(name.to_string()).or_insert(next)))
    }

    fn uniform_block_index(&self, program: NativeId, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let p = state.program_mut(program)?;
        let next = p.blocks.len() as u32;
        Some(*p.blocks.entry(name.to_string()).or_insert(next))
    }

    fn uniform_block_binding(&self, program: NativeId, index: u32, _binding: u32) {
        let mut state = self.state.borrow_mut();
        let known = state
            .program_mut(program)
            .is_some_and(|p| p.blocks.values().any(|b| *b == index));
        if !known {
            state.raise(glow::INVALID_VALUE);
        }
    }

    fn uniform_1_i32(&self, location: Option<&UniformLocation>, value: i32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Int(value));
    }

    fn uniform_1_f32(&self, location: Option<&UniformLocation>, value: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Float(value));
    }

    fn uniform_3_f32(&self, location: Option<&UniformLocation>, x: f32, y: f32, z: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec3([x, y, z]));
    }

    fn uniform_4_i32(&self, location: Option<&UniformLocation>, x: i32, y: i32, z: i32, w: i32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::IVec4([x, y, z, w]));
    }

    fn uniform_4_f32(&self, location: Option<&UniformLocation>, x: f32, y: f32, z: f32, w: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec4([x, y, z, w]));
    }

    fn uniform_matrix_3(&self, location: Option<&UniformLocation>, value: &[f32]) {
        let mut state = self.state.borrow_mut();
        if value.len() != 9 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.set_uniform(location, UniformValue::Matrix(value.to_vec()));
    }

    fn uniform_matrix_4(&self, location: Option<&UniformLocation>, value: &[f32]) {
        let mut state = self.state.borrow_mut();
        if value.len() != 16 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.set_uniform(location, UniformValue::Matrix(value.to_vec()));
    }

    fn create_texture(&self) -> Result<NativeId, String> {
        self.state
            .borrow_mut()
            .allocate(Object::Texture(TextureState::default()))
    }

    fn delete_texture(&self, texture: NativeId) {
        self.state.borrow_mut().release(texture, ObjectKind::Texture);
    }

    fn active_texture(&self, unit: u32) {
        let mut state = self.state.borrow_mut();
        // GL 3.3 guarantees at least 16 units per stage
        if !(glow::TEXTURE0..glow::TEXTURE0 + 32).contains(&unit) {
            state.raise(glow::INVALID_ENUM);
            return;
        }
        state.active_unit = unit - glow::TEXTURE0;
    }

    fn bind_texture(&self, target: u32, texture: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        let Some(name) = state.bind_check(texture, ObjectKind::Texture) else {
            return;
        };
        let unit = state.active_unit;
        match name {
            None => {
                state.textures.remove(&(unit, target));
            }
            Some(name) => {
                let existing = match state.objects.get(&name) {
                    Some(Object::Texture(t)) => t.target,
                    _ => None,
                };
                if existing.is_some_and(|existing| existing != target) {
                    state.raise(glow::INVALID_OPERATION);
                    return;
                }
                if let Some(Object::Texture(t)) = state.objects.get_mut(&name) {
                    t.target = Some(target);
                }
                state.textures.insert((unit, target), name);
            }
        }
    }

    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        _internal_format: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let face = is_cube_face(target).then(|| (target - glow::TEXTURE_CUBE_MAP_POSITIVE_X) as usize);
        let Some(texture) = state.bound_texture_mut(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if level != 0 {
            return;
        }
        let pixels = pixels.unwrap_or_default();
        match face {
            Some(face) => {
                texture.size = (width, height, 6);
                let face_len = pixels.len();
                if texture.data.len() < face_len * 6 {
                    texture.data.resize(face_len * 6, 0);
                }
                texture.data[face * face_len..(face + 1) * face_len].copy_from_slice(pixels);
            }
            None => {
                texture.size = (width, height, 1);
                texture.data = pixels.to_vec();
            }
        }
    }

    fn tex_image_3d(
        &self,
        target: u32,
        level: i32,
        _internal_format: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 || depth < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let Some(texture) = state.bound_texture_mut(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if level != 0 {
            return;
        }
        texture.size = (width, height, depth);
        texture.data = pixels.map_or_else(
            || vec![0; (width * height * depth) as usize * channels(format)],
            <[u8]>::to_vec,
        );
    }

    fn tex_sub_image_3d(
        &self,
        target: u32,
        level: i32,
        offset: [i32; 3],
        size: [i32; 3],
        format: u32,
        _ty: u32,
        pixels: &[u8],
    ) {
        let mut state = self.state.borrow_mut();
        let Some(texture) = state.bound_texture_mut(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        let (width, height, depth) = texture.size;
        let fits = offset[0] + size[0] <= width
            && offset[1] + size[1] <= height
            && offset[2] + size[2] <= depth
            && offset.iter().all(|o| *o >= 0);
        if !fits {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if level != 0 || offset[0] != 0 || offset[1] != 0 || size[0] != width || size[1] != height {
            // Only whole-layer uploads are mirrored into the byte store
            return;
        }
        let layer_len = (width * height) as usize * channels(format);
        let start = offset[2] as usize * layer_len;
        let end = start + pixels.len().min(size[2] as usize * layer_len);
        if end <= texture.data.len() {
            texture.data[start..end].copy_from_slice(&pixels[..end - start]);
        }
    }

    fn tex_parameter_i32(&self, target: u32, _parameter: u32, _value: i32) {
        let mut state = self.state.borrow_mut();
        if state.bound_texture_mut(target).is_none() {
            state.raise(glow::INVALID_OPERATION);
        }
    }

    fn tex_parameter_f32_slice(&self, target: u32, _parameter: u32, _values: &[f32]) {
        let mut state = self.state.borrow_mut();
        if state.bound_texture_mut(target).is_none() {
            state.raise(glow::INVALID_OPERATION);
        }
    }

    fn generate_mipmap(&self, target: u32) {
        let mut state = self.state.borrow_mut();
        if state.bound_texture_mut(target).is_none() {
            state.raise(glow::INVALID_OPERATION);
        }
    }

    fn create_framebuffer(&self) -> Result<NativeId, String> {
        self.state
            .borrow_mut()
            .allocate(Object::Framebuffer(FramebufferState::default()))
    }

    fn delete_framebuffer(&self, framebuffer: NativeId) {
        self.state
            .borrow_mut()
            .release(framebuffer, ObjectKind::Framebuffer);
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        let Some(name) = state.bind_check(framebuffer, ObjectKind::Framebuffer) else {
            return;
        };
        match target {
            glow::FRAMEBUFFER => {
                state.read_framebuffer = name;
                state.draw_framebuffer = name;
            }
            glow::READ_FRAMEBUFFER => state.read_framebuffer = name,
            glow::DRAW_FRAMEBUFFER => state.draw_framebuffer = name,
            _ => state.raise(glow::INVALID_ENUM),
        }
    }

    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        _texture_target: u32,
        texture: Option<NativeId>,
        _level: i32,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(texture) = state.bind_check(texture, ObjectKind::Texture) else {
            return;
        };
        let Some(fb) = state.framebuffer_for(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(Object::Framebuffer(fb)) = state.objects.get_mut(&fb) {
            match texture {
                Some(texture) => fb.attachments.insert(attachment, texture),
                None => fb.attachments.remove(&attachment),
            };
        }
    }

    fn framebuffer_renderbuffer(&self, target: u32, attachment: u32, renderbuffer: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        let Some(renderbuffer) = state.bind_check(renderbuffer, ObjectKind::Renderbuffer) else {
            return;
        };
        let Some(fb) = state.framebuffer_for(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(Object::Framebuffer(fb)) = state.objects.get_mut(&fb) {
            match renderbuffer {
                Some(rb) => fb.attachments.insert(attachment, rb),
                None => fb.attachments.remove(&attachment),
            };
        }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        let state = self.state.borrow();
        state.framebuffer_status(state.framebuffer_for(target))
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        let mut state = self.state.borrow_mut();
        let valid = buffers
            .iter()
            .all(|b| *b == glow::NONE || (glow::COLOR_ATTACHMENT0..glow::COLOR_ATTACHMENT0 + 8).contains(b));
        if !valid || state.draw_framebuffer.is_none() {
            state.raise(glow::INVALID_OPERATION);
        }
    }

    fn draw_buffer(&self, buffer: u32) {
        let valid = buffer == glow::NONE
            || buffer == glow::BACK
            || (glow::COLOR_ATTACHMENT0..glow::COLOR_ATTACHMENT0 + 8).contains(&buffer);
        if !valid {
            self.state.borrow_mut().raise(glow::INVALID_ENUM);
        }
    }

    fn read_buffer(&self, buffer: u32) {
        let valid = buffer == glow::NONE
            || buffer == glow::BACK
            || (glow::COLOR_ATTACHMENT0..glow::COLOR_ATTACHMENT0 + 8).contains(&buffer);
        if !valid {
            self.state.borrow_mut().raise(glow::INVALID_ENUM);
        }
    }

    fn blit_framebuffer(&self, _source: [i32; 4], _destination: [i32; 4], mask: u32, filter: u32) {
        let mut state = self.state.borrow_mut();
        let depth_or_stencil = mask & (glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT) != 0;
        if depth_or_stencil && filter != glow::NEAREST {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        let read = state.framebuffer_status(state.read_framebuffer);
        let draw = state.framebuffer_status(state.draw_framebuffer);
        if read != glow::FRAMEBUFFER_COMPLETE || draw != glow::FRAMEBUFFER_COMPLETE {
            state.raise(glow::INVALID_FRAMEBUFFER_OPERATION);
            return;
        }
        state.blits += 1;
    }

    fn create_renderbuffer(&self) -> Result<NativeId, String> {
        self.state.borrow_mut().allocate(Object::Renderbuffer((0, 0)))
    }

    fn delete_renderbuffer(&self, renderbuffer: NativeId) {
        self.state
            .borrow_mut()
            .release(renderbuffer, ObjectKind::Renderbuffer);
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        if let Some(name) = state.bind_check(renderbuffer, ObjectKind::Renderbuffer) {
            state.renderbuffer = name;
        }
    }

    fn renderbuffer_storage(&self, _internal_format: u32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        let Some(name) = state.renderbuffer else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(Object::Renderbuffer(size)) = state.objects.get_mut(&name) {
            *size = (width, height);
        }
    }

    fn create_buffer(&self) -> Result<NativeId, String> {
        self.state.borrow_mut().allocate(Object::Buffer(Vec::new()))
    }

    fn delete_buffer(&self, buffer: NativeId) {
        self.state.borrow_mut().release(buffer, ObjectKind::Buffer);
    }

    fn bind_buffer(&self, target: u32, buffer: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        let Some(name) = state.bind_check(buffer, ObjectKind::Buffer) else {
            return;
        };
        if target == glow::ELEMENT_ARRAY_BUFFER {
            let Some(vao) = state.vertex_array else {
                state.raise(glow::INVALID_OPERATION);
                return;
            };
            if let Some(Object::VertexArray(vao)) = state.objects.get_mut(&vao) {
                vao.element_buffer = name;
            }
            return;
        }
        match name {
            Some(name) => state.buffers.insert(target, name),
            None => state.buffers.remove(&target),
        };
    }

    fn bind_buffer_base(&self, target: u32, index: u32, buffer: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        let Some(name) = state.bind_check(buffer, ObjectKind::Buffer) else {
            return;
        };
        match name {
            Some(name) => {
                state.buffer_bases.insert((target, index), name);
                state.buffers.insert(target, name);
            }
            None => {
                state.buffer_bases.remove(&(target, index));
            }
        }
    }

    fn buffer_data_size(&self, target: u32, size: i32, _usage: u32) {
        let mut state = self.state.borrow_mut();
        if size < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        match state.bound_buffer_mut(target) {
            Some(data) => *data = vec![0; size as usize],
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn buffer_data(&self, target: u32, bytes: &[u8], _usage: u32) {
        let mut state = self.state.borrow_mut();
        match state.bound_buffer_mut(target) {
            Some(data) => *data = bytes.to_vec(),
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(data) = state.bound_buffer_mut(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        let start = offset.max(0) as usize;
        let end = start + bytes.len();
        if offset < 0 || end > data.len() {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        data[start..end].copy_from_slice(bytes);
    }

    fn write_mapped(&self, target: u32, offset: i32, bytes: &[u8]) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(data) = state.bound_buffer_mut(target) else {
            state.raise(glow::INVALID_OPERATION);
            return false;
        };
        let start = offset.max(0) as usize;
        let end = start + bytes.len();
        if offset < 0 || end > data.len() {
            state.raise(glow::INVALID_VALUE);
            return false;
        }
        data[start..end].copy_from_slice(bytes);
        true
    }

    fn create_vertex_array(&self) -> Result<NativeId, String> {
        self.state
            .borrow_mut()
            .allocate(Object::VertexArray(VertexArrayState::default()))
    }

    fn delete_vertex_array(&self, vertex_array: NativeId) {
        self.state
            .borrow_mut()
            .release(vertex_array, ObjectKind::VertexArray);
    }

    fn bind_vertex_array(&self, vertex_array: Option<NativeId>) {
        let mut state = self.state.borrow_mut();
        if let Some(name) = state.bind_check(vertex_array, ObjectKind::VertexArray) {
            state.vertex_array = name;
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, _ty: u32, _normalized: bool, _stride: i32, _offset: i32) {
        let mut state = self.state.borrow_mut();
        if state.vertex_array.is_none() || !state.buffers.contains_key(&glow::ARRAY_BUFFER) {
            state.raise(glow::INVALID_OPERATION);
        } else if index >= 16 || !(1..=4).contains(&size) {
            state.raise(glow::INVALID_VALUE);
        }
    }

    fn vertex_attrib_pointer_i32(&self, index: u32, size: i32, _ty: u32, _stride: i32, _offset: i32) {
        self.vertex_attrib_pointer_f32(index, size, glow::INT, false, 0, 0);
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        let Some(vao) = state.vertex_array else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(Object::VertexArray(vao)) = state.objects.get_mut(&vao) {
            if !vao.enabled.contains(&index) {
                vao.enabled.push(index);
            }
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.viewport = (x, y, width, height);
    }

    fn clear_color(&self, _red: f32, _green: f32, _blue: f32, _alpha: f32) {}

    fn clear(&self, mask: u32) {
        let mut state = self.state.borrow_mut();
        let known = glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT;
        if mask & !known != 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if state.framebuffer_status(state.draw_framebuffer) != glow::FRAMEBUFFER_COMPLETE {
            state.raise(glow::INVALID_FRAMEBUFFER_OPERATION);
            return;
        }
        state.clears += 1;
    }

    fn enable(&self, capability: u32) {
        let mut state = self.state.borrow_mut();
        if !state.capabilities.contains(&capability) {
            state.capabilities.push(capability);
        }
    }

    fn disable(&self, capability: u32) {
        self.state
            .borrow_mut()
            .capabilities
            .retain(|c| *c != capability);
    }

    fn depth_func(&self, func: u32) {
        let mut state = self.state.borrow_mut();
        match func {
            glow::NEVER
            | glow::LESS
            | glow::EQUAL
            | glow::LEQUAL
            | glow::GREATER
            | glow::NOTEQUAL
            | glow::GEQUAL
            | glow::ALWAYS => state.depth_func = func,
            _ => state.raise(glow::INVALID_ENUM),
        }
    }

    fn polygon_mode(&self, face: u32, mode: u32) {
        if face != glow::FRONT_AND_BACK || !matches!(mode, glow::POINT | glow::LINE | glow::FILL) {
            self.state.borrow_mut().raise(glow::INVALID_ENUM);
        }
    }

    fn draw_elements(&self, _mode: u32, count: i32, _ty: u32, _offset: i32) {
        let mut state = self.state.borrow_mut();
        if count < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if !state.check_draw() {
            return;
        }
        if state.bound_buffer_mut(glow::ELEMENT_ARRAY_BUFFER).is_none() {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        state.draw_calls += 1;
    }

    fn draw_arrays(&self, _mode: u32, first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        if first < 0 || count < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if state.check_draw() {
            state.draw_calls += 1;
        }
    }

    fn get_error(&self) -> u32 {
        std::mem::replace(&mut self.state.borrow_mut().pending_error, glow::NO_ERROR)
    }
}

const fn channels(format: u32) -> usize {
    match format {
        glow::RED | glow::DEPTH_COMPONENT | glow::RED_INTEGER => 1,
        glow::RG | glow::RG_INTEGER => 2,
        glow::RGB | glow::RGB_INTEGER => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_nonzero_and_unique() {
        let gl = HeadlessContext::new();
        let a = gl.create_texture().unwrap();
        let b = gl.create_buffer().unwrap();
        assert_ne!(a, b);
        assert_eq!(gl.live_objects(), 2);

        gl.delete_texture(a);
        assert_eq!(gl.live_count(ObjectKind::Texture), 0);
        assert_eq!(gl.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn test_double_delete_raises() {
        let gl = HeadlessContext::new();
        let shader = gl.create_shader(glow::VERTEX_SHADER).unwrap();
        gl.delete_shader(shader);
        gl.delete_shader(shader);
        assert_eq!(gl.get_error(), glow::INVALID_VALUE);
        assert_eq!(gl.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn test_draw_without_program_raises() {
        let gl = HeadlessContext::new();
        let vao = gl.create_vertex_array().unwrap();
        gl.bind_vertex_array(Some(vao));
        gl.draw_arrays(glow::TRIANGLES, 0, 3);
        assert_eq!(gl.get_error(), glow::INVALID_OPERATION);
        assert_eq!(gl.draw_calls(), 0);
    }

    #[test]
    fn test_incomplete_framebuffer_rejects_clear() {
        let gl = HeadlessContext::new();
        let fb = gl.create_framebuffer().unwrap();
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fb));
        assert_eq!(
            gl.check_framebuffer_status(glow::FRAMEBUFFER),
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        );
        gl.clear(glow::COLOR_BUFFER_BIT);
        assert_eq!(gl.get_error(), glow::INVALID_FRAMEBUFFER_OPERATION);
    }

    #[test]
    fn test_compile_failure_marker() {
        let gl = HeadlessContext::new();
        gl.fail_compilation_containing("#error");
        let shader = gl.create_shader(glow::FRAGMENT_SHADER).unwrap();
        gl.shader_source(shader, "#version 330 core\n#error broken\n");
        gl.compile_shader(shader);
        assert!(!gl.shader_compile_status(shader));
        assert!(gl.shader_info_log(shader).contains("#error"));
    }

    #[test]
    fn test_mapped_write_lands_in_buffer() {
        let gl = HeadlessContext::new();
        let buffer = gl.create_buffer().unwrap();
        gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
        gl.buffer_data_size(glow::UNIFORM_BUFFER, 8, glow::STREAM_DRAW);
        assert!(gl.write_mapped(glow::UNIFORM_BUFFER, 4, &[1, 2, 3, 4]));
        assert_eq!(gl.buffer_contents(buffer).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(!gl.write_mapped(glow::UNIFORM_BUFFER, 6, &[1, 2, 3, 4]));
    }
}
