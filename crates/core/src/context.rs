use glam::{DVec2, DVec3, DVec4};

use crate::arg_keys;
use crate::args::{ArgSet, HashValue};
use crate::math::Mat4d;

/// Arguments for one target invocation: frame, fps and operation keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeContext {
    args: ArgSet,
}

impl NodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_args(args: ArgSet) -> Self {
        Self { args }
    }

    pub fn with_time(frame: f64, fps: f64) -> Self {
        let mut ctx = Self::default();
        ctx.set_time(frame, fps);
        ctx
    }

    pub fn args(&self) -> &ArgSet {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut ArgSet {
        &mut self.args
    }

    pub fn into_args(self) -> ArgSet {
        self.args
    }

    pub fn has_arg(&self, key: &str) -> bool {
        self.args.has(key)
    }

    pub fn frame(&self) -> f64 {
        self.args.get_double(arg_keys::FRAME, 0.0)
    }

    pub fn set_frame(&mut self, frame: f64) {
        self.args.set_double(arg_keys::FRAME, frame);
    }

    pub fn fps(&self) -> f64 {
        self.args.get_double(arg_keys::FPS, 24.0)
    }

    pub fn set_fps(&mut self, fps: f64) {
        self.args.set_double(arg_keys::FPS, fps);
    }

    pub fn set_time(&mut self, frame: f64, fps: f64) {
        self.set_frame(frame);
        self.set_fps(fps);
    }

    /// Seconds for the current frame.
    pub fn time(&self) -> f64 {
        let fps = self.fps();
        if fps > 0.0 {
            self.frame() / fps
        } else {
            0.0
        }
    }

    pub fn get_string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.args.get_string(key, default)
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.args.get_int(key, default)
    }

    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.args.get_double(key, default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.args.get_bool(key, default)
    }

    pub fn get_hash(&self, key: &str, default: HashValue) -> HashValue {
        self.args.get_hash(key, default)
    }

    pub fn get_vec2d(&self, key: &str, default: DVec2) -> DVec2 {
        self.args.get_vec2d(key, default)
    }

    pub fn get_vec3d(&self, key: &str, default: DVec3) -> DVec3 {
        self.args.get_vec3d(key, default)
    }

    pub fn get_vec4d(&self, key: &str, default: DVec4) -> DVec4 {
        self.args.get_vec4d(key, default)
    }

    pub fn get_mat4d(&self, key: &str, default: Mat4d) -> Mat4d {
        self.args.get_mat4d(key, default)
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.args.set(key, value);
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.args.set_int(key, value);
    }

    pub fn set_double(&mut self, key: impl Into<String>, value: f64) {
        self.args.set_double(key, value);
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.args.set_bool(key, value);
    }

    pub fn set_hash(&mut self, key: impl Into<String>, value: HashValue) {
        self.args.set_hash(key, value);
    }
}

impl From<ArgSet> for NodeContext {
    fn from(args: ArgSet) -> Self {
        Self::from_args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_accessors() {
        let ctx = NodeContext::with_time(48.0, 24.0);
        assert_eq!(ctx.frame(), 48.0);
        assert_eq!(ctx.fps(), 24.0);
        assert_eq!(ctx.time(), 2.0);
        assert_eq!(ctx.args().get(arg_keys::FRAME), "48.0");
    }

    #[test]
    fn typed_access_passes_through() {
        let mut ctx = NodeContext::new();
        ctx.set_int(arg_keys::scene::PATH_MAX_DEPTH, 7);
        ctx.set_string(arg_keys::scene::PATH, "/");
        assert_eq!(ctx.get_int(arg_keys::scene::PATH_MAX_DEPTH, 0), 7);
        assert_eq!(ctx.get_string(arg_keys::scene::PATH, ""), "/");
        assert_eq!(NodeContext::new().fps(), 24.0);
    }
}
