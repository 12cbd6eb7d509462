//! Full-pipeline tests: build a topology, compute routes, then push traffic
//! across the links the routes point at.

use ipnetwork::Ipv4Network;
use p2psim_abstract::{LinkConfig, Mac48, Packet, Time};
use p2psim_routing::{GlobalRouting, RoutingTable};
use p2psim_simulator::{DeviceId, Network, NodeId, Simulator};
use std::net::Ipv4Addr;

fn prefix(s: &str) -> Ipv4Network {
    s.parse().unwrap()
}

struct Ring {
    sim: Simulator,
    routing: GlobalRouting,
    routers: Vec<NodeId>,
}

/// A square of four routers, each /30 link metric 1.
///
///     r0 -- r1
///     |      |
///     r3 -- r2
fn build_ring() -> Ring {
    let mut net = Network::new();
    let routers: Vec<NodeId> = (0..4).map(|i| net.add_node(format!("r{i}"))).collect();

    let mut routing = GlobalRouting::new();
    for (i, &(a, b)) in [
        (routers[0], routers[1]),
        (routers[1], routers[2]),
        (routers[2], routers[3]),
        (routers[3], routers[0]),
    ]
    .iter()
    .enumerate()
    {
        let (dev_a, dev_b) = net.connect(a, b, &LinkConfig::default());
        let third = i as u8 + 1;
        routing.assign_address(
            dev_a,
            Ipv4Network::new(Ipv4Addr::new(10, 0, third, 1), 30).unwrap(),
        );
        routing.assign_address(
            dev_b,
            Ipv4Network::new(Ipv4Addr::new(10, 0, third, 2), 30).unwrap(),
        );
    }
    for &r in &routers {
        routing.add_router(r);
    }

    Ring {
        sim: Simulator::new(net),
        routing,
        routers,
    }
}

#[test]
fn ring_routes_take_the_short_way_around() {
    let mut ring = build_ring();
    ring.routing.initialize_routes(&ring.sim.network);

    // r0's neighbors are one hop; the diagonal r2 is two hops both ways.
    let table = ring.routing.table_for_node(ring.routers[0]).unwrap();
    assert_eq!(table.get(&prefix("10.0.1.0/30")).unwrap().distance, 1);
    assert_eq!(table.get(&prefix("10.0.4.0/30")).unwrap().distance, 1);
    assert_eq!(table.get(&prefix("10.0.2.0/30")).unwrap().distance, 2);
    assert_eq!(table.get(&prefix("10.0.3.0/30")).unwrap().distance, 2);
}

#[test]
fn subnet_behind_the_diagonal_router_gets_two_nexthops() {
    let mut ring = build_ring();

    // A host subnet that only r2 advertises, so r0 must cross the ring.
    let host = ring.sim.network.add_node("host");
    let (dev_r2, dev_host) =
        ring.sim
            .network
            .connect(ring.routers[2], host, &LinkConfig::default());
    ring.routing.assign_address(dev_r2, prefix("10.0.8.1/30"));
    ring.routing.assign_address(dev_host, prefix("10.0.8.2/30"));
    ring.routing.initialize_routes(&ring.sim.network);

    // Both ways around the ring cost the same; ECMP keeps both first hops.
    let table = ring.routing.table_for_node(ring.routers[0]).unwrap();
    let route = table.get(&prefix("10.0.8.0/30")).unwrap();
    assert_eq!(route.distance, 3);
    assert_eq!(route.nexthops.len(), 2);
}

#[test]
fn every_router_reaches_every_subnet() {
    let mut ring = build_ring();
    ring.routing.initialize_routes(&ring.sim.network);

    for &router in &ring.routers {
        let table = ring.routing.table_for_node(router).unwrap();
        for third in 1..=4 {
            let subnet = prefix(&format!("10.0.{third}.0/30"));
            assert!(
                table.get(&subnet).is_some(),
                "router {router:?} missing {subnet}"
            );
        }
    }
}

#[test]
fn traffic_follows_an_installed_route() {
    let mut ring = build_ring();
    ring.routing.initialize_routes(&ring.sim.network);

    // Route from r0 toward r2's far side; send one frame out the nexthop
    // device and watch it arrive at the neighbor that route named.
    let table = ring.routing.table_for_node(ring.routers[0]).unwrap();
    let route = table.get(&prefix("10.0.2.0/30")).unwrap().clone();
    let hop = *route.nexthops.first().unwrap();

    let expected_peer = ring.sim.network.peer_of(hop.device).unwrap();
    let peer_node = ring.sim.network.device(expected_peer).node();
    assert_eq!(ring.routing.router_id_of(peer_node), Some(hop.via));

    ring.sim
        .schedule_send(Time::ZERO, hop.device, Packet::of_size(1250), Mac48::BROADCAST);
    ring.sim.run_until_complete();

    let delivered = ring.sim.deliveries_to(peer_node);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].device, expected_peer);
    assert_eq!(delivered[0].time_ns, Time::from_millis(3).as_nanos());
}

#[test]
fn topology_change_is_picked_up_on_recomputation() {
    let mut ring = build_ring();
    ring.routing.initialize_routes(&ring.sim.network);
    let before: RoutingTable = ring
        .routing
        .table_for_node(ring.routers[0])
        .unwrap()
        .clone();

    // A fifth router hangs off r2; nothing about it is known yet.
    assert!(before.get(&prefix("10.0.9.0/30")).is_none());

    let r4 = ring.sim.network.add_node("r4");
    let (dev_r2, dev_r4) =
        ring.sim
            .network
            .connect(ring.routers[2], r4, &LinkConfig::default());
    ring.routing.assign_address(dev_r2, prefix("10.0.9.1/30"));
    ring.routing.assign_address(dev_r4, prefix("10.0.9.2/30"));
    ring.routing.add_router(r4);

    ring.routing.initialize_routes(&ring.sim.network);
    let after = ring.routing.table_for_node(ring.routers[0]).unwrap();
    assert_eq!(after.get(&prefix("10.0.9.0/30")).unwrap().distance, 3);
}

#[test]
fn router_ids_allocate_in_creation_order() {
    let ring = build_ring();
    let ids: Vec<String> = ring
        .routers
        .iter()
        .map(|&r| ring.routing.router_id_of(r).unwrap().to_string())
        .collect();
    assert_eq!(ids, ["0.0.0.1", "0.0.0.2", "0.0.0.3", "0.0.0.4"]);
}

#[test]
fn nexthop_devices_belong_to_the_computing_router() {
    let mut ring = build_ring();
    ring.routing.initialize_routes(&ring.sim.network);

    for &router in &ring.routers {
        let table = ring.routing.table_for_node(router).unwrap();
        for (_, entry) in table.iter() {
            for hop in &entry.nexthops {
                let owner = ring.sim.network.device(hop.device).node();
                assert_eq!(owner, router, "nexthop device owned by a foreign node");
            }
        }
    }
}

#[test]
fn spf_distance_matches_hop_count_on_a_long_chain() {
    let mut net = Network::new();
    let nodes: Vec<NodeId> = (0..6).map(|i| net.add_node(format!("r{i}"))).collect();
    let mut routing = GlobalRouting::new();
    for i in 0..5 {
        let (da, db) = net.connect(nodes[i], nodes[i + 1], &LinkConfig::default());
        let third = i as u8 + 1;
        routing.assign_address(
            da,
            Ipv4Network::new(Ipv4Addr::new(10, 0, third, 1), 30).unwrap(),
        );
        routing.assign_address(
            db,
            Ipv4Network::new(Ipv4Addr::new(10, 0, third, 2), 30).unwrap(),
        );
    }
    for &n in &nodes {
        routing.add_router(n);
    }
    routing.initialize_routes(&net);

    let table = routing.table_for_node(nodes[0]).unwrap();
    for third in 1..=5u8 {
        let subnet = prefix(&format!("10.0.{third}.0/30"));
        assert_eq!(table.get(&subnet).unwrap().distance, third as u32);
    }
    // Every remote route leaves through r0's single device.
    let far = table.get(&prefix("10.0.5.0/30")).unwrap();
    assert_eq!(far.nexthops.first().unwrap().device, DeviceId(0));
}
