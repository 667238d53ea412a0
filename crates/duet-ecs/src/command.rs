//! Deferred structural changes to a [`World`].
//!
//! Views hand out component references only, so a system that wants to
//! destroy an entity (or attach / detach a component) while iterating queues
//! the change on a [`CommandBuffer`]. The buffer is applied once, after every
//! update system has run, in strict insertion (FIFO) order.
//!
//! Commands whose target has died in the meantime are skipped with a warning
//! and reported in the [`ApplyReport`]; they never abort the tick.
//!
//! ```
//! use duet_ecs::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Health(u32);
//!
//! let mut world = World::new();
//! let e = world.create();
//! world.add(e, Health(3));
//!
//! let mut cmds = CommandBuffer::new();
//! world.view1::<Health>(|entity, hp| {
//!     if hp.0 < 5 {
//!         cmds.destroy(entity);
//!     }
//! });
//! let report = cmds.apply(&mut world);
//! assert_eq!(report.success_count, 1);
//! assert!(!world.is_alive(e));
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::component::Component;
use crate::entity::EntityId;
use crate::world::World;
use crate::EcsError;

/// A boxed deferred edit of one entity.
pub type Mutation = Box<dyn FnOnce(&mut World, EntityId) + Send>;

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// What a queued command does to its target.
pub enum CommandKind {
    /// Create a new entity and run the builder on it.
    Spawn { build: Mutation },
    /// Attach a component (insert or overwrite).
    Add {
        component: &'static str,
        type_id: TypeId,
        apply: Mutation,
    },
    /// Detach a component. Absent components are a no-op.
    Remove {
        component: &'static str,
        type_id: TypeId,
        apply: Mutation,
    },
    /// Destroy the entity and all of its components.
    Destroy,
}

impl CommandKind {
    fn label(&self) -> &'static str {
        match self {
            CommandKind::Spawn { .. } => "spawn",
            CommandKind::Add { .. } => "add",
            CommandKind::Remove { .. } => "remove",
            CommandKind::Destroy => "destroy",
        }
    }

    /// `(type, name)` of the component this command touches, if any.
    fn component(&self) -> Option<(TypeId, &'static str)> {
        match self {
            CommandKind::Add {
                component, type_id, ..
            }
            | CommandKind::Remove {
                component, type_id, ..
            } => Some((*type_id, *component)),
            CommandKind::Spawn { .. } | CommandKind::Destroy => None,
        }
    }
}

impl fmt::Debug for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component() {
            Some((_, name)) => write!(f, "{}({name})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A single deferred mutation.
#[derive(Debug)]
pub struct Command {
    /// Entity the command targets. [`EntityId::NONE`] for spawns.
    pub target: EntityId,
    /// What to do.
    pub kind: CommandKind,
    /// Sequential index within the buffer, set on insertion.
    pub command_index: u32,
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Outcome of one [`CommandBuffer::apply`] call.
///
/// `conflict_count` counts `(entity, component)` pairs targeted by more than
/// one command in the same batch. Later commands win; conflicts are warnings,
/// not errors.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Commands that mutated the world.
    pub success_count: usize,
    /// Commands skipped because their target was gone.
    pub failed_count: usize,
    /// `(entity, component)` pairs hit by several commands.
    pub conflict_count: usize,
    /// Entities created by spawn commands, in order.
    pub spawned: Vec<EntityId>,
    /// Why each failed command was skipped.
    pub failures: Vec<EcsError>,
}

impl ApplyReport {
    /// Whether every command applied.
    pub fn is_clean(&self) -> bool {
        self.failed_count == 0
    }
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// Collects structural changes and applies them in insertion order.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    next_index: u32,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue creation of a new entity; `build` runs on it at apply time.
    pub fn spawn(&mut self, build: impl FnOnce(&mut World, EntityId) + Send + 'static) {
        self.push(
            EntityId::NONE,
            CommandKind::Spawn {
                build: Box::new(build),
            },
        );
    }

    /// Queue attaching `value` to `target` (overwriting any existing `T`).
    pub fn add<T: Component>(&mut self, target: EntityId, value: T) {
        self.push(
            target,
            CommandKind::Add {
                component: std::any::type_name::<T>(),
                type_id: TypeId::of::<T>(),
                apply: Box::new(move |world: &mut World, entity: EntityId| {
                    world.add(entity, value);
                }),
            },
        );
    }

    /// Queue detaching `T` from `target`.
    pub fn remove<T: Component>(&mut self, target: EntityId) {
        self.push(
            target,
            CommandKind::Remove {
                component: std::any::type_name::<T>(),
                type_id: TypeId::of::<T>(),
                apply: Box::new(|world: &mut World, entity: EntityId| {
                    world.remove::<T>(entity);
                }),
            },
        );
    }

    /// Queue destruction of `target`.
    pub fn destroy(&mut self, target: EntityId) {
        self.push(target, CommandKind::Destroy);
    }

    fn push(&mut self, target: EntityId, kind: CommandKind) {
        self.commands.push(Command {
            target,
            kind,
            command_index: self.next_index,
        });
        self.next_index += 1;
    }

    /// Queued commands in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command without applying it.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_index = 0;
    }

    /// Apply every queued command to `world` in FIFO order and empty the
    /// buffer.
    ///
    /// A command whose target is not alive when its turn comes is skipped.
    /// That includes targets destroyed by an earlier command in the same
    /// batch, so "destroy twice" reports one failure rather than panicking.
    pub fn apply(&mut self, world: &mut World) -> ApplyReport {
        let commands = std::mem::take(&mut self.commands);
        self.next_index = 0;

        let mut report = ApplyReport {
            conflict_count: count_conflicts(&commands),
            ..ApplyReport::default()
        };

        for cmd in commands {
            let label = cmd.kind.label();
            if !matches!(cmd.kind, CommandKind::Spawn { .. }) && !world.is_alive(cmd.target) {
                warn!(
                    entity = %cmd.target,
                    command = label,
                    command_index = cmd.command_index,
                    "skipping command for stale entity"
                );
                report.failed_count += 1;
                report.failures.push(EcsError::StaleEntity { entity: cmd.target });
                continue;
            }

            match cmd.kind {
                CommandKind::Spawn { build } => {
                    let entity = world.create();
                    build(world, entity);
                    report.spawned.push(entity);
                }
                CommandKind::Add { apply, .. } | CommandKind::Remove { apply, .. } => {
                    apply(world, cmd.target);
                }
                CommandKind::Destroy => {
                    world.destroy(cmd.target);
                }
            }
            report.success_count += 1;
        }

        if report.success_count + report.failed_count > 0 {
            debug!(
                applied = report.success_count,
                failed = report.failed_count,
                conflicts = report.conflict_count,
                "command buffer applied"
            );
        }
        report
    }
}

fn count_conflicts(commands: &[Command]) -> usize {
    let mut seen: HashMap<(EntityId, TypeId), Vec<u32>> = HashMap::new();
    let mut names: HashMap<TypeId, &'static str> = HashMap::new();
    for cmd in commands {
        if let Some((type_id, name)) = cmd.kind.component() {
            seen.entry((cmd.target, type_id))
                .or_default()
                .push(cmd.command_index);
            names.insert(type_id, name);
        }
    }

    let mut conflicts = 0;
    for ((entity, type_id), indices) in &seen {
        if indices.len() > 1 {
            conflicts += 1;
            warn!(
                %entity,
                component = names.get(type_id).copied().unwrap_or("?"),
                command_indices = ?indices,
                "{} commands target the same entity+component (last write wins)",
                indices.len()
            );
        }
    }
    conflicts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
