//! Per-node state and the per-tick step pipeline.
//!
//! Each tick a node runs four steps: admit inbound messages under the
//! inbound cap, generate its own messages, coalesce duplicate keys in its
//! staging buffers, and emit buffered messages upward under the outbound
//! cap. The first three steps touch only the node's own state and run in
//! parallel across disjoint node ranges; emit writes into other nodes'
//! inboxes, so the driver runs it as a separate single-threaded sweep and
//! this module only returns the outgoing messages (the deliveries land in
//! inboxes that are drained no earlier than the next tick, preserving the
//! one-tick floor on hop latency).

use crate::message::{Message, MessageKind};
use crate::stats::RollingCounters;
use crate::tree::TreeLink;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// Per-tree state carried by a node.
#[derive(Debug, Clone, Default)]
pub struct TreeSlot {
    /// Parent node id in this tree; `None` at the root.
    pub parent: Option<usize>,
    /// Hub level in this tree; `None` for non-hub rack members.
    pub level: Option<u32>,
    /// Whether this node coalesces on this tree.
    pub gc: bool,
    /// Forwarding delay in ticks applied on admission when `gc` holds.
    pub gc_delay: i64,
    /// Staging buffer, drained from the head by emit.
    pub buf: VecDeque<Message>,
}

/// Inbox entry; the heap is min-ordered by forward time, ties arbitrary.
#[derive(Debug, Clone)]
struct Inbound(Message);

impl PartialEq for Inbound {
    fn eq(&self, other: &Self) -> bool {
        self.0.forward_time == other.0.forward_time
    }
}

impl Eq for Inbound {}

impl PartialOrd for Inbound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Inbound {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert for earliest-first.
        other.0.forward_time.cmp(&self.0.forward_time)
    }
}

/// A simulated node.
#[derive(Debug)]
pub struct Node {
    pub id: usize,
    /// One slot per tree.
    pub slots: Vec<TreeSlot>,
    inbox: BinaryHeap<Inbound>,
    /// Per-tick byte budgets.
    pub in_cap: i64,
    pub out_cap: i64,
    /// Bytes used within the current tick.
    pub in_used: i64,
    pub out_used: i64,
    /// Messages generated per tick.
    pub msgs_per_tick: i64,
    /// Keys staged by the driver for this tick's generation.
    key_reserve: VecDeque<i64>,
    pub counters: RollingCounters,
    /// Lifetime effective weight absorbed here as a tree root.
    pub absorbed_weight: i64,
}

impl Node {
    pub fn new(id: usize, ntrees: usize, in_cap: i64, out_cap: i64, msgs_per_tick: i64) -> Self {
        Self {
            id,
            slots: (0..ntrees).map(|_| TreeSlot::default()).collect(),
            inbox: BinaryHeap::new(),
            in_cap,
            out_cap,
            in_used: 0,
            out_used: 0,
            msgs_per_tick,
            key_reserve: VecDeque::new(),
            counters: RollingCounters::default(),
            absorbed_weight: 0,
        }
    }

    /// Install the per-tree linkage produced by the tree builder.
    pub fn apply_links(&mut self, links: &[TreeLink]) {
        assert_eq!(links.len(), self.slots.len());
        for (slot, link) in self.slots.iter_mut().zip(links) {
            slot.parent = link.parent;
            slot.level = link.level;
            slot.gc = link.gc;
            slot.gc_delay = link.gc_delay;
        }
    }

    /// Deliver a message into the inbox; it will be considered for
    /// admission from the next tick's first sweep on.
    pub fn push_inbound(&mut self, msg: Message) {
        self.inbox.push(Inbound(msg));
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// Stage one key for this tick's generation.
    pub fn stage_key(&mut self, key: i64) {
        self.key_reserve.push_back(key);
    }

    /// Steps 1-3: admit, generate, coalesce. Touches only this node's
    /// state; safe to run in parallel across disjoint node ranges.
    pub fn first_sweep(&mut self, tick: i64, msg_size: i64, gc_period: i64) {
        self.in_used = 0;
        self.out_used = 0;
        self.admit(tick, msg_size);
        self.generate(tick, msg_size);
        if tick % gc_period == 0 {
            self.coalesce(msg_size);
        }
    }

    /// Step 1: drain the inbox earliest-first until the inbound cap is hit.
    /// Admission restamps the forward time: now plus the GC delay where this
    /// node coalesces on the message's tree, plain now otherwise.
    fn admit(&mut self, tick: i64, msg_size: i64) {
        while self.in_used + msg_size <= self.in_cap {
            let Some(Inbound(mut msg)) = self.inbox.pop() else {
                break;
            };
            let slot = &mut self.slots[msg.tree];
            msg.forward_time = if slot.gc { tick + slot.gc_delay } else { tick };
            slot.buf.push_back(msg);
            self.in_used += msg_size;
        }
        self.counters.in_bytes += self.in_used;
    }

    /// Step 2: generate this node's own messages, spread round-robin over
    /// the trees with a tick-dependent offset.
    fn generate(&mut self, tick: i64, msg_size: i64) {
        let ntrees = self.slots.len() as i64;
        for j in 0..self.msgs_per_tick {
            let key = self
                .key_reserve
                .pop_front()
                .expect("key reserve exhausted mid-tick");
            let tree = ((j + tick) % ntrees) as usize;
            let slot = &mut self.slots[tree];
            let forward_time = if slot.gc { tick + slot.gc_delay } else { tick };
            slot.buf.push_back(Message::data(key, tree, forward_time));
        }
        self.counters.self_bytes += self.msgs_per_tick * msg_size;
    }

    /// Step 3: one coalescing pass per GC-enabled tree. Within a buffer the
    /// first DATA occurrence of each key survives and accumulates the
    /// weight of the later ones; the later ones become tombstones. The map
    /// is rebuilt every pass and never survives across ticks.
    fn coalesce(&mut self, msg_size: i64) {
        let mut saved = 0i64;
        for slot in &mut self.slots {
            if !slot.gc || slot.buf.is_empty() {
                continue;
            }
            let pos = slot.buf.len();
            let mut first_at: HashMap<i64, usize> = HashMap::with_capacity(pos);
            for j in 0..pos {
                if !slot.buf[j].is_data() {
                    continue;
                }
                match first_at.entry(slot.buf[j].key) {
                    Entry::Occupied(entry) => {
                        let survivor = *entry.get();
                        let weight = slot.buf[j].suppress();
                        slot.buf[survivor].eff_size += weight;
                        saved += 1;
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(j);
                    }
                }
            }
        }
        self.counters.saved_bytes += saved * msg_size;
    }

    /// Step 4: emit buffered messages until the outbound cap is hit or no
    /// tree can make progress. Head tombstones are discarded without
    /// consuming bandwidth; a single pass per tree per iteration of the
    /// outer loop gives round-robin fairness across trees. Returns the
    /// messages bound for parent inboxes; root traffic is absorbed here.
    pub fn emit(&mut self, tick: i64, msg_size: i64) -> Vec<(usize, Message)> {
        let mut outgoing = Vec::new();
        loop {
            let mut progress = false;
            for slot in &mut self.slots {
                while slot
                    .buf
                    .front()
                    .is_some_and(|m| m.kind == MessageKind::Tombstone)
                {
                    slot.buf.pop_front();
                }
                let Some(head) = slot.buf.front() else {
                    continue;
                };
                if head.forward_time > tick || self.out_used + msg_size > self.out_cap {
                    continue;
                }
                let msg = slot.buf.pop_front().expect("head vanished");
                assert!(
                    msg.eff_size > 0,
                    "emitting message with eff_size {}",
                    msg.eff_size
                );
                self.out_used += msg_size;
                self.counters.out_bytes += msg_size;
                self.counters.eff_out_bytes += msg.eff_size * msg_size;
                match slot.parent {
                    Some(parent) => outgoing.push((parent, msg)),
                    None => self.absorbed_weight += msg.eff_size,
                }
                progress = true;
            }
            if !progress {
                break;
            }
        }
        outgoing
    }

    /// Effective weight resident in this node's buffers and inbox.
    pub fn resident_weight(&self) -> i64 {
        let buffered: i64 = self
            .slots
            .iter()
            .flat_map(|s| s.buf.iter())
            .map(|m| m.eff_size)
            .sum();
        let inbound: i64 = self.inbox.iter().map(|i| i.0.eff_size).sum();
        buffered + inbound
    }
}
