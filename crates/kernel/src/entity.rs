use crate::geometry::Geometry;
use diorama_common::{Color, Transform};

/// Surface appearance of an entity.
///
/// `base_color` is what the panel sets; `color` is what is shown this frame.
/// They differ only while a transient override (highlight) is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: Color,
    pub color: Color,
    pub wireframe: bool,
    /// Contributes to the bloom pass regardless of brightness threshold.
    pub emissive: bool,
    /// Only honoured when `transparent` is set. The stock scene is opaque;
    /// these two are for imported or caller-built materials.
    pub opacity: f32,
    pub transparent: bool,
    /// Procedural checker texture modulating the colour.
    pub checker: bool,
    pub double_sided: bool,
    /// Shaded by scene lights. Unlit materials show their colour as-is.
    pub lit: bool,
}

impl Material {
    pub fn new(color: Color) -> Self {
        Self {
            base_color: color,
            color,
            wireframe: false,
            emissive: false,
            opacity: 1.0,
            transparent: false,
            checker: false,
            double_sided: false,
            lit: true,
        }
    }

    /// Flat colour, ignores lights.
    pub fn unlit(color: Color) -> Self {
        Self {
            lit: false,
            ..Self::new(color)
        }
    }

    pub fn checkered(mut self) -> Self {
        self.checker = true;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn glowing(mut self) -> Self {
        self.emissive = true;
        self
    }

    /// Blend at `opacity`, clamped to `[0, 1]`.
    pub fn translucent(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn is_highlighted(&self) -> bool {
        self.color != self.base_color
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

/// Shadow participation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowFlags {
    pub casts: bool,
    pub receives: bool,
}

impl ShadowFlags {
    pub const CASTS: Self = Self {
        casts: true,
        receives: false,
    };
    pub const RECEIVES: Self = Self {
        casts: false,
        receives: true,
    };
}

/// A renderable or light-emitting node.
///
/// Fields are private: after [`Registry::spawn`](crate::Registry::spawn) the
/// only way to change an entity is through the registry setters.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    geometry: Geometry,
    pub(crate) material: Material,
    pub(crate) transform: Transform,
    shadows: ShadowFlags,
    pickable: bool,
}

impl Entity {
    /// New entity with a white lit material at the origin. Lights are not
    /// pickable; everything else is.
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        let pickable = !geometry.is_light();
        Self {
            name: name.into(),
            geometry,
            material: Material::default(),
            transform: Transform::default(),
            shadows: ShadowFlags::default(),
            pickable,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, shadows: ShadowFlags) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn with_pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable && !self.geometry.is_light();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn shadows(&self) -> ShadowFlags {
        self.shadows
    }

    pub fn is_pickable(&self) -> bool {
        self.pickable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Light;

    #[test]
    fn lights_cannot_be_made_pickable() {
        let light = Entity::new(
            "sun",
            Geometry::Light(Light::Ambient {
                color: Color::WHITE,
                intensity: 1.0,
            }),
        )
        .with_pickable(true);
        assert!(!light.is_pickable());
    }

    #[test]
    fn fresh_material_is_not_highlighted() {
        let m = Material::new(Color::from_hex(0x00ff00));
        assert!(!m.is_highlighted());
        assert_eq!(m.opacity, 1.0);
        assert!(m.lit);
        assert!(!Material::unlit(Color::WHITE).lit);
    }
}
