//! A resource manager built on top of `slot_pool`:
//!
//! * One pool per resource type, all owned by a single manager.
//! * Textures release their backing memory via `Dispose`, meshes are simply dropped.
//! * A path-to-handle cache so the same texture file is only loaded once.
//! * Other systems keep plain handles and detect when a resource has been freed.
//!
//! Run with `RUST_LOG=slot_pool=trace` to see pool growth and stale deallocation events.

use std::collections::HashMap;

use slot_pool::{CallDispose, Dispose, Handle, SlotPool};
use tracing_subscriber::EnvFilter;

/// Identifier of memory owned by an imaginary graphics device.
type DeviceMemoryId = u64;

#[derive(Debug)]
struct Texture {
    path: String,
    width: u32,
    height: u32,
    memory: Option<DeviceMemoryId>,
}

impl Dispose for Texture {
    fn dispose(&mut self) {
        if let Some(memory) = self.memory.take() {
            println!(
                "Releasing device memory {memory} of texture {} ({}x{})",
                self.path, self.width, self.height
            );
        }
    }
}

#[derive(Debug)]
struct Mesh {
    name: String,
    vertices: Vec<[f32; 3]>,
}

#[derive(Debug)]
struct ResourceManager {
    textures: SlotPool<Texture, CallDispose>,
    meshes: SlotPool<Mesh>,
    texture_cache: HashMap<String, Handle<Texture>>,
    next_memory_id: DeviceMemoryId,
}

impl ResourceManager {
    fn new() -> Self {
        Self {
            textures: SlotPool::builder()
                .initial_capacity(2)
                .dispose_on_free()
                .build(),
            meshes: SlotPool::new(),
            texture_cache: HashMap::new(),
            next_memory_id: 1,
        }
    }

    /// Returns the cached texture for the path if it is still loaded, otherwise loads it.
    fn load_texture(&mut self, path: &str) -> Handle<Texture> {
        if let Some(handle) = self.texture_cache.get(path) {
            if self.textures.contains(*handle) {
                return *handle;
            }
        }

        let memory = self.next_memory_id;
        self.next_memory_id = self
            .next_memory_id
            .checked_add(1)
            .expect("device memory identifiers are never exhausted in this example");

        let handle = self.textures.allocate(Texture {
            path: path.to_string(),
            width: 256,
            height: 256,
            memory: Some(memory),
        });

        self.texture_cache.insert(path.to_string(), handle);
        handle
    }

    fn unload_texture(&mut self, handle: Handle<Texture>) {
        if let Some(texture) = self.textures.get(handle) {
            self.texture_cache.remove(&texture.path);
        }

        self.textures.deallocate(handle);
    }

    fn create_mesh(&mut self, name: &str, vertices: Vec<[f32; 3]>) -> Handle<Mesh> {
        self.meshes.allocate(Mesh {
            name: name.to_string(),
            vertices,
        })
    }
}

/// Something in the scene that refers to resources by handle.
#[derive(Debug)]
struct Renderable {
    mesh: Handle<Mesh>,
    texture: Handle<Texture>,
}

fn draw(resources: &ResourceManager, renderable: &Renderable) {
    let mesh = resources.meshes.get(renderable.mesh);
    let texture = resources.textures.get(renderable.texture);

    match (mesh, texture) {
        (Some(mesh), Some(texture)) => println!(
            "Drawing {} ({} vertices) with {}",
            mesh.name,
            mesh.vertices.len(),
            texture.path
        ),
        _ => println!("Skipping renderable that refers to freed resources: {renderable:?}"),
    }
}

fn main() {
    _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let mut resources = ResourceManager::new();

    let grass = resources.load_texture("textures/grass.png");
    let stone = resources.load_texture("textures/stone.png");

    // Loading the same path again hits the cache.
    assert_eq!(resources.load_texture("textures/grass.png"), grass);

    let ground = resources.create_mesh(
        "ground",
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
    );
    let wall = resources.create_mesh(
        "wall",
        vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
    );

    let scene = [
        Renderable {
            mesh: ground,
            texture: grass,
        },
        Renderable {
            mesh: wall,
            texture: stone,
        },
    ];

    for renderable in &scene {
        draw(&resources, renderable);
    }

    // Free the stone texture while the wall still refers to it.
    resources.unload_texture(stone);

    // Loading water reuses the slot stone occupied.
    let water = resources.load_texture("textures/water.png");
    println!(
        "Water texture reuses slot {} (stone was generation {}, water is generation {})",
        water.index(),
        stone.generation(),
        water.generation()
    );

    // The wall is skipped rather than being drawn with the water texture.
    for renderable in &scene {
        draw(&resources, renderable);
    }

    // Reloading stone creates a new texture, which forces the texture pool to grow.
    let stone_again = resources.load_texture("textures/stone.png");
    assert_ne!(stone_again, stone);

    println!(
        "Textures: {} loaded, capacity {}. Meshes: {} loaded, capacity {}",
        resources.textures.len(),
        resources.textures.capacity(),
        resources.meshes.len(),
        resources.meshes.capacity()
    );

    // Dropping the manager disposes every texture that is still loaded.
    drop(resources);
}
