//! WGSL kernels for multi-graph BFS
//!
//! One module, two entry points, one workgroup per graph. The workgroup size
//! must be a pipeline constant, so the source is a template instantiated per
//! width by [`multi_bfs_shader`].

/// Kernel source with `{{WORKGROUP_SIZE}}` and `{{FRONTIER_CAPACITY}}` holes
pub const MULTI_BFS_TEMPLATE: &str = r"
const UNVISITED: u32 = 0xffffffffu;
const WG: u32 = {{WORKGROUP_SIZE}}u;

@group(0) @binding(0) var<storage, read> graph_offsets: array<u32>;
@group(0) @binding(1) var<storage, read> node_counts: array<u32>;
@group(0) @binding(2) var<storage, read> sources: array<u32>;
@group(0) @binding(3) var<storage, read> offsets: array<u32>;
@group(0) @binding(4) var<storage, read> edges: array<u32>;
@group(0) @binding(5) var<storage, read_write> distances: array<atomic<u32>>;
@group(0) @binding(6) var<storage, read_write> parents: array<u32>;
@group(0) @binding(7) var<storage, read_write> status: array<u32>;

// Two halves of WG slots; level l reads half l % 2 and appends to the other
var<workgroup> frontier: array<u32, {{FRONTIER_CAPACITY}}>;
var<workgroup> next_size: atomic<u32>;
var<workgroup> current_size: u32;

@compute @workgroup_size({{WORKGROUP_SIZE}})
fn init_graphs(
    @builtin(workgroup_id) group_id: vec3<u32>,
    @builtin(local_invocation_id) local_id: vec3<u32>,
) {
    let g = group_id.x;
    let base = graph_offsets[g];
    let n = node_counts[g];
    let source = sources[g];

    for (var i = local_id.x; i < n; i += WG) {
        if (i == source) {
            atomicStore(&distances[base + i], 0u);
            parents[base + i] = source;
        } else {
            atomicStore(&distances[base + i], UNVISITED);
            parents[base + i] = UNVISITED;
        }
    }
    if (local_id.x == 0u) {
        status[g] = 0u;
    }
}

// A level's claims all carry the same distance, so exactly one lane sees UNVISITED
fn claim(index: u32, distance: u32) -> bool {
    return atomicMin(&distances[index], distance) == UNVISITED;
}

@compute @workgroup_size({{WORKGROUP_SIZE}})
fn frontier_bfs(
    @builtin(workgroup_id) group_id: vec3<u32>,
    @builtin(local_invocation_id) local_id: vec3<u32>,
) {
    let g = group_id.x;
    let lane = local_id.x;
    let base = graph_offsets[g];

    if (lane == 0u) {
        let source = sources[g];
        atomicStore(&distances[base + source], 0u);
        parents[base + source] = source;
        frontier[0] = source;
        current_size = 1u;
        atomicStore(&next_size, 0u);
    }

    var level = 0u;
    loop {
        // Implies a workgroup barrier
        let size = workgroupUniformLoad(&current_size);
        if (size == 0u) {
            break;
        }

        let read_half = (level & 1u) * WG;
        let write_half = WG - read_half;
        if (lane < size) {
            let node = frontier[read_half + lane];
            let at = base + node;
            for (var e = offsets[at]; e < offsets[at + 1u]; e += 1u) {
                let neighbor = edges[e];
                if (claim(base + neighbor, level + 1u)) {
                    parents[base + neighbor] = node;
                    let slot = atomicAdd(&next_size, 1u);
                    if (slot < WG) {
                        frontier[write_half + slot] = neighbor;
                    }
                }
            }
        }
        workgroupBarrier();

        if (lane == 0u) {
            let produced = atomicExchange(&next_size, 0u);
            if (produced > WG) {
                status[g] = produced;
                current_size = 0u;
            } else {
                current_size = produced;
            }
        }
        level += 1u;
    }
}
";

/// Instantiate the kernels for `work_group_size` lanes per group
#[must_use]
pub fn multi_bfs_shader(work_group_size: u32) -> String {
    MULTI_BFS_TEMPLATE
        .replace("{{WORKGROUP_SIZE}}", &work_group_size.to_string())
        .replace("{{FRONTIER_CAPACITY}}", &(2 * work_group_size).to_string())
}

/// Workgroup memory the kernels need for `work_group_size` lanes
#[must_use]
pub const fn workgroup_storage_bytes(work_group_size: u32) -> u32 {
    // frontier + next_size + current_size
    (2 * work_group_size + 2) * 4
}
