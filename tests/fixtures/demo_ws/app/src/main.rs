mod report;

use core_lib::compute;

fn main() {
    core_lib::init();
    let total = compute(3);
    report::print(total);
    let square = core_lib::shapes::Square(2);
    let run = || square.area();
    report::print(run());
}
